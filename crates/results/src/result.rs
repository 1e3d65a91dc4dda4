use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use registra_academics::CourseId;
use registra_core::{Aggregate, AggregateId, AggregateRoot, UserId};
use registra_events::Event;

use crate::grade::Grade;

/// Result identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub AggregateId);

impl ResultId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ResultId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<ResultId> for uuid::Uuid {
    fn from(value: ResultId) -> Self {
        value.0.into()
    }
}

/// Result workflow state.
///
/// `approved` is terminal for visibility: it is the only state in which the
/// student sees the result. It is not terminal for the machine: an admin
/// reopen sends it back to `draft` for the full path again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultState {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl ResultState {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultState::Draft => "draft",
            ResultState::Submitted => "submitted",
            ResultState::Approved => "approved",
            ResultState::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for ResultState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a workflow operation was refused.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("result is in state '{actual}', operation requires '{required}'")]
    WrongState {
        required: &'static str,
        actual: ResultState,
    },

    #[error("lecturer is not assigned to this course")]
    NotAssigned,

    #[error("student is not enrolled in this course")]
    NotEnrolled,

    #[error("acting lecturer did not enter this result")]
    NotOwner,
}

/// Aggregate root: a single student-course result.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentResult {
    id: ResultId,
    student_id: UserId,
    course_id: CourseId,
    score: f64,
    grade: Grade,
    state: ResultState,
    entered_by: UserId,
    approved_by: Option<UserId>,
    reject_reason: Option<String>,
    updated_at: DateTime<Utc>,
    version: u64,
    created: bool,
}

impl StudentResult {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ResultId) -> Self {
        Self {
            id,
            student_id: UserId::from_uuid(uuid::Uuid::nil()),
            course_id: CourseId(AggregateId::from_uuid(uuid::Uuid::nil())),
            score: 0.0,
            grade: Grade::F,
            state: ResultState::Draft,
            entered_by: UserId::from_uuid(uuid::Uuid::nil()),
            approved_by: None,
            reject_reason: None,
            updated_at: DateTime::<Utc>::MIN_UTC,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ResultId {
        self.id
    }

    pub fn student_id(&self) -> UserId {
        self.student_id
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    pub fn entered_by(&self) -> UserId {
        self.entered_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn created(&self) -> bool {
        self.created
    }

    /// The visibility invariant: a result is visible to its student iff it
    /// is approved.
    pub fn student_visible(&self) -> bool {
        self.state == ResultState::Approved
    }
}

impl AggregateRoot for StudentResult {
    type Id = ResultId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: enter a score (creates a draft, or overwrites an existing draft).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterResult {
    pub result_id: ResultId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub lecturer_id: UserId,
    pub score: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: hand a draft to the admin for approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub result_id: ResultId,
    pub lecturer_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: approve a submitted result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveResult {
    pub result_id: ResultId,
    pub admin_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: reject a submitted result back to the lecturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectResult {
    pub result_id: ResultId,
    pub admin_id: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: revise a rejected result (back to draft with a new score).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviseResult {
    pub result_id: ResultId,
    pub lecturer_id: UserId,
    pub new_score: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: reopen an approved result (admin-only correction path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenResult {
    pub result_id: ResultId,
    pub admin_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultCommand {
    Enter(EnterResult),
    Submit(SubmitResult),
    Approve(ApproveResult),
    Reject(RejectResult),
    Revise(ReviseResult),
    Reopen(ReopenResult),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntered {
    pub result_id: ResultId,
    pub student_id: UserId,
    pub course_id: CourseId,
    pub lecturer_id: UserId,
    pub score: f64,
    pub grade: Grade,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmitted {
    pub result_id: ResultId,
    pub lecturer_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultApproved {
    pub result_id: ResultId,
    pub admin_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRejected {
    pub result_id: ResultId,
    pub admin_id: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRevised {
    pub result_id: ResultId,
    pub lecturer_id: UserId,
    pub score: f64,
    pub grade: Grade,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReopened {
    pub result_id: ResultId,
    pub admin_id: UserId,
    /// Who had approved the result before the correction.
    pub previous_approver: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultEvent {
    Entered(ResultEntered),
    Submitted(ResultSubmitted),
    Approved(ResultApproved),
    Rejected(ResultRejected),
    Revised(ResultRevised),
    Reopened(ResultReopened),
}

impl Event for ResultEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ResultEvent::Entered(_) => "results.result.entered",
            ResultEvent::Submitted(_) => "results.result.submitted",
            ResultEvent::Approved(_) => "results.result.approved",
            ResultEvent::Rejected(_) => "results.result.rejected",
            ResultEvent::Revised(_) => "results.result.revised",
            ResultEvent::Reopened(_) => "results.result.reopened",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ResultEvent::Entered(e) => e.occurred_at,
            ResultEvent::Submitted(e) => e.occurred_at,
            ResultEvent::Approved(e) => e.occurred_at,
            ResultEvent::Rejected(e) => e.occurred_at,
            ResultEvent::Revised(e) => e.occurred_at,
            ResultEvent::Reopened(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for StudentResult {
    type Command = ResultCommand;
    type Event = ResultEvent;
    type Error = WorkflowError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ResultEvent::Entered(e) => {
                self.id = e.result_id;
                self.student_id = e.student_id;
                self.course_id = e.course_id;
                self.score = e.score;
                self.grade = e.grade;
                self.state = ResultState::Draft;
                self.entered_by = e.lecturer_id;
                self.approved_by = None;
                self.reject_reason = None;
                self.updated_at = e.occurred_at;
                self.created = true;
            }
            ResultEvent::Submitted(e) => {
                self.state = ResultState::Submitted;
                self.updated_at = e.occurred_at;
            }
            ResultEvent::Approved(e) => {
                self.state = ResultState::Approved;
                self.approved_by = Some(e.admin_id);
                self.updated_at = e.occurred_at;
            }
            ResultEvent::Rejected(e) => {
                self.state = ResultState::Rejected;
                self.reject_reason = Some(e.reason.clone());
                self.updated_at = e.occurred_at;
            }
            ResultEvent::Revised(e) => {
                self.score = e.score;
                self.grade = e.grade;
                self.state = ResultState::Draft;
                self.reject_reason = None;
                self.updated_at = e.occurred_at;
            }
            ResultEvent::Reopened(e) => {
                self.state = ResultState::Draft;
                self.approved_by = None;
                self.updated_at = e.occurred_at;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ResultCommand::Enter(cmd) => self.handle_enter(cmd),
            ResultCommand::Submit(cmd) => self.handle_submit(cmd),
            ResultCommand::Approve(cmd) => self.handle_approve(cmd),
            ResultCommand::Reject(cmd) => self.handle_reject(cmd),
            ResultCommand::Revise(cmd) => self.handle_revise(cmd),
            ResultCommand::Reopen(cmd) => self.handle_reopen(cmd),
        }
    }
}

impl StudentResult {
    fn require_state(
        &self,
        wanted: ResultState,
        required: &'static str,
    ) -> Result<(), WorkflowError> {
        if self.state != wanted {
            return Err(WorkflowError::WrongState {
                required,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn handle_enter(&self, cmd: &EnterResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        // A fresh aggregate, or an overwrite of an existing draft. Anything
        // past draft must travel the revise/reopen edges instead.
        if self.created {
            self.require_state(ResultState::Draft, "draft")?;
        }

        Ok(vec![ResultEvent::Entered(ResultEntered {
            result_id: cmd.result_id,
            student_id: cmd.student_id,
            course_id: cmd.course_id,
            lecturer_id: cmd.lecturer_id,
            score: cmd.score,
            grade: Grade::from_score(cmd.score),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        self.require_state(ResultState::Draft, "draft")?;
        if cmd.lecturer_id != self.entered_by {
            return Err(WorkflowError::NotOwner);
        }

        Ok(vec![ResultEvent::Submitted(ResultSubmitted {
            result_id: cmd.result_id,
            lecturer_id: cmd.lecturer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        self.require_state(ResultState::Submitted, "submitted")?;

        Ok(vec![ResultEvent::Approved(ResultApproved {
            result_id: cmd.result_id,
            admin_id: cmd.admin_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        self.require_state(ResultState::Submitted, "submitted")?;

        Ok(vec![ResultEvent::Rejected(ResultRejected {
            result_id: cmd.result_id,
            admin_id: cmd.admin_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        self.require_state(ResultState::Rejected, "rejected")?;
        if cmd.lecturer_id != self.entered_by {
            return Err(WorkflowError::NotOwner);
        }

        Ok(vec![ResultEvent::Revised(ResultRevised {
            result_id: cmd.result_id,
            lecturer_id: cmd.lecturer_id,
            score: cmd.new_score,
            grade: Grade::from_score(cmd.new_score),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reopen(&self, cmd: &ReopenResult) -> Result<Vec<ResultEvent>, WorkflowError> {
        self.require_state(ResultState::Approved, "approved")?;

        Ok(vec![ResultEvent::Reopened(ResultReopened {
            result_id: cmd.result_id,
            admin_id: cmd.admin_id,
            previous_approver: self.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
