//! The result workflow service.
//!
//! The aggregate in [`crate::result`] owns the state machine; this service
//! owns everything the machine cannot see: course assignment and enrollment
//! guards, the commit/conflict protocol against the store, and the audit
//! trail for approval-touching transitions.

use chrono::{DateTime, Utc};
use thiserror::Error;

use registra_academics::{CatalogStore, CourseId};
use registra_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, StoreError, UserId};
use registra_events::{AuditEntry, AuditLog};

use crate::grade::{Grade, validate_score};
use crate::result::{
    ApproveResult, EnterResult, RejectResult, ReopenResult, ResultCommand, ResultId, ResultState,
    ReviseResult, StudentResult, SubmitResult, WorkflowError,
};
use crate::store::ResultStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What a student is allowed to see: score and grade, approved results only.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResultView {
    pub result_id: ResultId,
    pub course_id: CourseId,
    pub score: f64,
    pub grade: Grade,
}

pub struct ResultWorkflow<C, R, A> {
    catalog: C,
    results: R,
    audit: A,
}

impl<C, R, A> ResultWorkflow<C, R, A>
where
    C: CatalogStore,
    R: ResultStore,
    A: AuditLog,
{
    pub fn new(catalog: C, results: R, audit: A) -> Self {
        Self {
            catalog,
            results,
            audit,
        }
    }

    /// Enter a score for an enrolled student in a course the lecturer is
    /// assigned to. Creates a draft, or overwrites an existing draft.
    pub fn enter(
        &self,
        lecturer_id: UserId,
        student_id: UserId,
        course_id: CourseId,
        score: f64,
        now: DateTime<Utc>,
    ) -> Result<ResultId, ResultError> {
        validate_score(score)?;

        let course = self.catalog.get_course(course_id)?;
        if course.lecturer_id != lecturer_id {
            return Err(WorkflowError::NotAssigned.into());
        }
        if self.catalog.get_enrollment(student_id, course_id)?.is_none() {
            return Err(WorkflowError::NotEnrolled.into());
        }

        match self.results.find_by_student_course(student_id, course_id)? {
            None => {
                let result_id = ResultId::new();
                let mut result = StudentResult::empty(result_id);
                let cmd = ResultCommand::Enter(EnterResult {
                    result_id,
                    student_id,
                    course_id,
                    lecturer_id,
                    score,
                    occurred_at: now,
                });
                for event in result.handle(&cmd)? {
                    result.apply(&event);
                }
                match self.results.insert(result) {
                    Ok(()) => {}
                    Err(StoreError::Conflict(_)) => {
                        // Another enter won the race for this (student, course).
                        let actual = self
                            .results
                            .find_by_student_course(student_id, course_id)?
                            .map(|r| r.state())
                            .unwrap_or(ResultState::Draft);
                        return Err(WorkflowError::WrongState {
                            required: "draft",
                            actual,
                        }
                        .into());
                    }
                    Err(e) => return Err(e.into()),
                }
                tracing::info!(result_id = %result_id, course_id = %course_id, "result entered");
                Ok(result_id)
            }
            Some(existing) => {
                let cmd = ResultCommand::Enter(EnterResult {
                    result_id: existing.id_typed(),
                    student_id,
                    course_id,
                    lecturer_id,
                    score,
                    occurred_at: now,
                });
                self.transition(&existing, &cmd, "draft")?;
                Ok(existing.id_typed())
            }
        }
    }

    /// Edit a result the lecturer entered: overwrite a draft, or revise a
    /// rejected one back to draft. Any other state is refused.
    pub fn edit(
        &self,
        lecturer_id: UserId,
        result_id: ResultId,
        new_score: f64,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        validate_score(new_score)?;

        let current = self.results.get(result_id)?;
        if current.entered_by() != lecturer_id {
            return Err(WorkflowError::NotOwner.into());
        }

        let (cmd, required) = match current.state() {
            ResultState::Draft => (
                ResultCommand::Enter(EnterResult {
                    result_id,
                    student_id: current.student_id(),
                    course_id: current.course_id(),
                    lecturer_id,
                    score: new_score,
                    occurred_at: now,
                }),
                "draft",
            ),
            ResultState::Rejected => (
                ResultCommand::Revise(ReviseResult {
                    result_id,
                    lecturer_id,
                    new_score,
                    occurred_at: now,
                }),
                "rejected",
            ),
            actual => {
                return Err(WorkflowError::WrongState {
                    required: "draft or rejected",
                    actual,
                }
                .into());
            }
        };

        self.transition(&current, &cmd, required)?;
        Ok(())
    }

    /// Hand a draft to the admin: draft -> submitted.
    pub fn submit(
        &self,
        lecturer_id: UserId,
        result_id: ResultId,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        let current = self.results.get(result_id)?;
        let cmd = ResultCommand::Submit(SubmitResult {
            result_id,
            lecturer_id,
            occurred_at: now,
        });
        self.transition(&current, &cmd, "draft")?;
        Ok(())
    }

    /// Approve a submitted result. Records the approver and audits.
    pub fn approve(
        &self,
        admin_id: UserId,
        result_id: ResultId,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        let current = self.results.get(result_id)?;
        let cmd = ResultCommand::Approve(ApproveResult {
            result_id,
            admin_id,
            occurred_at: now,
        });
        self.transition(&current, &cmd, "submitted")?;

        self.audit.append(AuditEntry::new(
            admin_id,
            result_id,
            ResultState::Submitted.as_str(),
            ResultState::Approved.as_str(),
            now,
        ))?;
        tracing::info!(result_id = %result_id, admin_id = %admin_id, "result approved");
        Ok(())
    }

    /// Reject a submitted result back to the lecturer, with a reason.
    pub fn reject(
        &self,
        admin_id: UserId,
        result_id: ResultId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        let current = self.results.get(result_id)?;
        let cmd = ResultCommand::Reject(RejectResult {
            result_id,
            admin_id,
            reason: reason.into(),
            occurred_at: now,
        });
        self.transition(&current, &cmd, "submitted")?;

        self.audit.append(AuditEntry::new(
            admin_id,
            result_id,
            ResultState::Submitted.as_str(),
            ResultState::Rejected.as_str(),
            now,
        ))?;
        tracing::info!(result_id = %result_id, admin_id = %admin_id, "result rejected");
        Ok(())
    }

    /// Revise a rejected result: rejected -> draft with a new score.
    pub fn revise(
        &self,
        lecturer_id: UserId,
        result_id: ResultId,
        new_score: f64,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        validate_score(new_score)?;

        let current = self.results.get(result_id)?;
        let cmd = ResultCommand::Revise(ReviseResult {
            result_id,
            lecturer_id,
            new_score,
            occurred_at: now,
        });
        self.transition(&current, &cmd, "rejected")?;
        Ok(())
    }

    /// Admin-only correction path: approved -> draft. The audit entry names
    /// the prior approver; a reopened result travels the full
    /// draft -> submitted -> approved path again.
    pub fn reopen(
        &self,
        admin_id: UserId,
        result_id: ResultId,
        now: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        let current = self.results.get(result_id)?;
        let previous_approver = current.approved_by();
        let cmd = ResultCommand::Reopen(ReopenResult {
            result_id,
            admin_id,
            occurred_at: now,
        });
        self.transition(&current, &cmd, "approved")?;

        let mut entry = AuditEntry::new(
            admin_id,
            result_id,
            ResultState::Approved.as_str(),
            ResultState::Draft.as_str(),
            now,
        );
        if let Some(approver) = previous_approver {
            entry = entry.with_detail(format!("reopened; previously approved by {approver}"));
        }
        self.audit.append(entry)?;
        tracing::info!(result_id = %result_id, admin_id = %admin_id, "result reopened");
        Ok(())
    }

    /// The student-visible projection: the score only ever leaves through
    /// here once the result is approved.
    pub fn student_view(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<ResultView>, ResultError> {
        let Some(result) = self.results.find_by_student_course(student_id, course_id)? else {
            return Ok(None);
        };
        if !result.student_visible() {
            return Ok(None);
        }
        Ok(Some(ResultView {
            result_id: result.id_typed(),
            course_id: result.course_id(),
            score: result.score(),
            grade: result.grade(),
        }))
    }

    /// Load a result record (for ownership checks at the boundary).
    pub fn get(&self, result_id: ResultId) -> Result<StudentResult, ResultError> {
        Ok(self.results.get(result_id)?)
    }

    /// Run a command against a snapshot and commit optimistically. A version
    /// conflict means another transition won; the loser is told the state
    /// that actually holds now, never silently overwritten.
    fn transition(
        &self,
        current: &StudentResult,
        cmd: &ResultCommand,
        required: &'static str,
    ) -> Result<StudentResult, ResultError> {
        let events = current.handle(cmd)?;
        let mut next = current.clone();
        for event in &events {
            next.apply(event);
        }

        match self
            .results
            .commit(next.clone(), ExpectedVersion::Exact(current.version()))
        {
            Ok(()) => Ok(next),
            Err(StoreError::Conflict(_)) => {
                let actual = self.results.get(current.id_typed())?.state();
                Err(WorkflowError::WrongState { required, actual }.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use registra_academics::{Course, Department, DepartmentId, Enrollment, Faculty, Semester};
    use registra_events::InMemoryAuditLog;

    #[derive(Default)]
    struct FakeCatalog {
        courses: RwLock<HashMap<CourseId, Course>>,
        enrollments: RwLock<Vec<Enrollment>>,
    }

    impl CatalogStore for FakeCatalog {
        fn create_faculty(&self, _faculty: Faculty) -> Result<(), StoreError> {
            Ok(())
        }

        fn create_department(&self, _department: Department) -> Result<(), StoreError> {
            Ok(())
        }

        fn create_course(&self, course: Course) -> Result<(), StoreError> {
            self.courses.write().unwrap().insert(course.course_id, course);
            Ok(())
        }

        fn get_course(&self, course_id: CourseId) -> Result<Course, StoreError> {
            self.courses
                .read()
                .unwrap()
                .get(&course_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        fn assign_lecturer(
            &self,
            course_id: CourseId,
            lecturer_id: UserId,
        ) -> Result<(), StoreError> {
            let mut courses = self.courses.write().unwrap();
            let course = courses.get_mut(&course_id).ok_or(StoreError::NotFound)?;
            course.lecturer_id = lecturer_id;
            Ok(())
        }

        fn enroll(&self, enrollment: Enrollment) -> Result<(), StoreError> {
            self.enrollments.write().unwrap().push(enrollment);
            Ok(())
        }

        fn get_enrollment(
            &self,
            student_id: UserId,
            course_id: CourseId,
        ) -> Result<Option<Enrollment>, StoreError> {
            Ok(self
                .enrollments
                .read()
                .unwrap()
                .iter()
                .find(|e| e.student_id == student_id && e.course_id == course_id)
                .cloned())
        }

        fn roster(&self, course_id: CourseId) -> Result<Vec<UserId>, StoreError> {
            Ok(self
                .enrollments
                .read()
                .unwrap()
                .iter()
                .filter(|e| e.course_id == course_id)
                .map(|e| e.student_id)
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeResults {
        inner: RwLock<HashMap<ResultId, StudentResult>>,
    }

    impl ResultStore for FakeResults {
        fn get(&self, result_id: ResultId) -> Result<StudentResult, StoreError> {
            self.inner
                .read()
                .unwrap()
                .get(&result_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        fn find_by_student_course(
            &self,
            student_id: UserId,
            course_id: CourseId,
        ) -> Result<Option<StudentResult>, StoreError> {
            Ok(self
                .inner
                .read()
                .unwrap()
                .values()
                .find(|r| r.student_id() == student_id && r.course_id() == course_id)
                .cloned())
        }

        fn insert(&self, result: StudentResult) -> Result<(), StoreError> {
            let mut inner = self.inner.write().unwrap();
            if inner.contains_key(&result.id_typed()) {
                return Err(StoreError::conflict("result id exists"));
            }
            if inner
                .values()
                .any(|r| r.student_id() == result.student_id() && r.course_id() == result.course_id())
            {
                return Err(StoreError::conflict("result for (student, course) exists"));
            }
            inner.insert(result.id_typed(), result);
            Ok(())
        }

        fn commit(
            &self,
            result: StudentResult,
            expected: ExpectedVersion,
        ) -> Result<(), StoreError> {
            let mut inner = self.inner.write().unwrap();
            let existing = inner.get(&result.id_typed()).ok_or(StoreError::NotFound)?;
            expected.check(existing.version())?;
            inner.insert(result.id_typed(), result);
            Ok(())
        }
    }

    struct Fixture {
        workflow: Arc<ResultWorkflow<Arc<FakeCatalog>, Arc<FakeResults>, Arc<InMemoryAuditLog>>>,
        audit: Arc<InMemoryAuditLog>,
        lecturer: UserId,
        student: UserId,
        course_id: CourseId,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(FakeCatalog::default());
        let results = Arc::new(FakeResults::default());
        let audit = Arc::new(InMemoryAuditLog::new());

        let lecturer = UserId::new();
        let student = UserId::new();
        let course = Course::new(
            CourseId::new(),
            "CSC301",
            "Systems Programming",
            DepartmentId::new(),
            300,
            3,
            Semester::Harmattan,
            lecturer,
        )
        .unwrap();
        let course_id = course.course_id;
        catalog.create_course(course).unwrap();
        catalog
            .enroll(Enrollment {
                student_id: student,
                course_id,
                session: "2024/2025".to_string(),
                enrolled_at: Utc::now(),
            })
            .unwrap();

        Fixture {
            workflow: Arc::new(ResultWorkflow::new(catalog, results, audit.clone())),
            audit,
            lecturer,
            student,
            course_id,
        }
    }

    #[test]
    fn unassigned_lecturer_cannot_enter() {
        let fx = fixture();
        let err = fx
            .workflow
            .enter(UserId::new(), fx.student, fx.course_id, 85.0, Utc::now())
            .unwrap_err();
        assert_eq!(err, ResultError::Workflow(WorkflowError::NotAssigned));
    }

    #[test]
    fn unenrolled_student_cannot_receive_a_result() {
        let fx = fixture();
        let err = fx
            .workflow
            .enter(fx.lecturer, UserId::new(), fx.course_id, 85.0, Utc::now())
            .unwrap_err();
        assert_eq!(err, ResultError::Workflow(WorkflowError::NotEnrolled));
    }

    #[test]
    fn full_path_makes_the_score_visible_and_audited() {
        let fx = fixture();
        let now = Utc::now();
        let admin = UserId::new();

        let result_id = fx
            .workflow
            .enter(fx.lecturer, fx.student, fx.course_id, 85.0, now)
            .unwrap();

        // Hidden until approved.
        assert!(fx.workflow.student_view(fx.student, fx.course_id).unwrap().is_none());

        fx.workflow.submit(fx.lecturer, result_id, now).unwrap();
        fx.workflow.approve(admin, result_id, now).unwrap();

        let view = fx
            .workflow
            .student_view(fx.student, fx.course_id)
            .unwrap()
            .expect("approved result must be visible");
        assert_eq!(view.score, 85.0);
        assert_eq!(view.grade, Grade::A);

        let trail = fx.audit.by_target(result_id.into()).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].actor_id, admin);
        assert_eq!(trail[0].to_state, "approved");
    }

    #[test]
    fn score_out_of_range_never_reaches_the_store() {
        let fx = fixture();
        let err = fx
            .workflow
            .enter(fx.lecturer, fx.student, fx.course_id, 130.0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ResultError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn concurrent_approve_and_reject_admit_exactly_one_winner() {
        let fx = fixture();
        let now = Utc::now();

        let result_id = fx
            .workflow
            .enter(fx.lecturer, fx.student, fx.course_id, 62.0, now)
            .unwrap();
        fx.workflow.submit(fx.lecturer, result_id, now).unwrap();

        let approver = UserId::new();
        let rejecter = UserId::new();

        let w1 = fx.workflow.clone();
        let w2 = fx.workflow.clone();
        let approve = std::thread::spawn(move || w1.approve(approver, result_id, now));
        let reject =
            std::thread::spawn(move || w2.reject(rejecter, result_id, "double-check", now));

        let outcomes = [approve.join().unwrap(), reject.join().unwrap()];
        let winners = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(winners, 1, "exactly one transition must win: {outcomes:?}");

        let loser = outcomes.iter().find(|o| o.is_err()).unwrap();
        assert!(matches!(
            loser,
            Err(ResultError::Workflow(WorkflowError::WrongState { .. }))
        ));
    }

    #[test]
    fn reopen_requires_the_full_path_again() {
        let fx = fixture();
        let now = Utc::now();
        let admin = UserId::new();

        let result_id = fx
            .workflow
            .enter(fx.lecturer, fx.student, fx.course_id, 71.0, now)
            .unwrap();
        fx.workflow.submit(fx.lecturer, result_id, now).unwrap();
        fx.workflow.approve(admin, result_id, now).unwrap();
        fx.workflow.reopen(admin, result_id, now).unwrap();

        // Hidden again, and not directly approvable.
        assert!(fx.workflow.student_view(fx.student, fx.course_id).unwrap().is_none());
        let err = fx.workflow.approve(admin, result_id, now).unwrap_err();
        assert!(matches!(
            err,
            ResultError::Workflow(WorkflowError::WrongState { .. })
        ));

        // The reopen audit entry names the prior approver.
        let trail = fx.audit.by_target(result_id.into()).unwrap();
        let reopen_entry = trail.iter().find(|e| e.to_state == "draft").unwrap();
        assert!(
            reopen_entry
                .detail
                .as_deref()
                .unwrap()
                .contains(&admin.to_string())
        );
    }

    #[test]
    fn edit_is_confined_to_draft_and_rejected() {
        let fx = fixture();
        let now = Utc::now();
        let admin = UserId::new();

        let result_id = fx
            .workflow
            .enter(fx.lecturer, fx.student, fx.course_id, 58.0, now)
            .unwrap();

        // Draft: overwrite allowed.
        fx.workflow.edit(fx.lecturer, result_id, 61.0, now).unwrap();
        assert_eq!(fx.workflow.get(result_id).unwrap().grade(), Grade::B);

        // Not by someone else.
        let err = fx.workflow.edit(UserId::new(), result_id, 10.0, now).unwrap_err();
        assert_eq!(err, ResultError::Workflow(WorkflowError::NotOwner));

        fx.workflow.submit(fx.lecturer, result_id, now).unwrap();

        // Submitted: refused.
        let err = fx.workflow.edit(fx.lecturer, result_id, 65.0, now).unwrap_err();
        assert!(matches!(
            err,
            ResultError::Workflow(WorkflowError::WrongState { .. })
        ));

        // Rejected: revise path back to draft.
        fx.workflow.reject(admin, result_id, "recheck", now).unwrap();
        fx.workflow.edit(fx.lecturer, result_id, 66.0, now).unwrap();
        assert_eq!(fx.workflow.get(result_id).unwrap().state(), ResultState::Draft);
    }
}
