//! The access gateway.
//!
//! One struct owns the whole authority: the token authority, the session
//! policy, the credential vault, the lifecycle service and the result
//! workflow, all over shared store handles. Protected operations first
//! resolve the acting identity (token -> session -> user record), then run
//! the permission table, then execute.

use std::sync::Arc;

use chrono::Utc;

use registra_academics::{
    CatalogStore, Course, CourseId, Department, DepartmentId, Enrollment, Faculty, FacultyId,
    Semester,
};
use registra_auth::{
    AccountLifecycle, Action, Actor, CredentialVault, Decision, DenyReason, LifecycleState, Role,
    SessionPolicy, SessionStore, TokenAuthority, UserRecord, UserStore, authorize, hash_password,
};
use registra_auth::SessionError;
use registra_core::{SessionId, StoreError, UserId};
use registra_events::AuditLog;
use registra_results::{ResultId, ResultStore, ResultView, ResultWorkflow, WorkflowError};

use crate::error::AccessError;

/// Outcome of a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub session_id: SessionId,
    /// Bearer token for subsequent requests.
    pub token: String,
}

// Manual Debug: the token is a credential and stays out of logs.
impl core::fmt::Debug for AuthSuccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSuccess")
            .field("session_id", &self.session_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub struct AccessGateway<U, S, C, R, A>
where
    U: UserStore,
    S: SessionStore,
    C: CatalogStore,
    R: ResultStore,
    A: AuditLog,
{
    tokens: TokenAuthority,
    policy: SessionPolicy,
    users: Arc<U>,
    sessions: Arc<S>,
    catalog: Arc<C>,
    vault: CredentialVault<Arc<U>, Arc<S>>,
    lifecycle: AccountLifecycle<Arc<U>, Arc<S>, Arc<A>>,
    workflow: ResultWorkflow<Arc<C>, Arc<R>, Arc<A>>,
}

impl<U, S, C, R, A> AccessGateway<U, S, C, R, A>
where
    U: UserStore,
    S: SessionStore,
    C: CatalogStore,
    R: ResultStore,
    A: AuditLog,
{
    pub fn new(
        tokens: TokenAuthority,
        policy: SessionPolicy,
        users: Arc<U>,
        sessions: Arc<S>,
        catalog: Arc<C>,
        results: Arc<R>,
        audit: Arc<A>,
    ) -> Self {
        let vault = CredentialVault::new(users.clone(), sessions.clone());
        let lifecycle = AccountLifecycle::new(users.clone(), sessions.clone(), audit.clone());
        let workflow = ResultWorkflow::new(catalog.clone(), results, audit);
        Self {
            tokens,
            policy,
            users,
            sessions,
            catalog,
            vault,
            lifecycle,
            workflow,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Identity & sessions
    // ─────────────────────────────────────────────────────────────────────

    /// Self-service student registration, the one unauthenticated mutation.
    /// Lecturers and admins are provisioned, never self-registered.
    pub fn register_student(&self, secret: &str) -> Result<UserId, AccessError> {
        let user_id = UserId::new();
        self.create_account(user_id, Role::Student, secret)?;
        tracing::info!(user_id = %user_id, "student registered");
        Ok(user_id)
    }

    /// Admin provisioning of lecturer/admin accounts.
    pub fn provision_user(
        &self,
        token: &str,
        role: Role,
        secret: &str,
    ) -> Result<UserId, AccessError> {
        let actor = self.authorize_request(token, Action::ProvisionUser, None)?;
        let user_id = UserId::new();
        self.create_account(user_id, role, secret)?;
        tracing::info!(user_id = %user_id, role = %role, actor_id = %actor.user_id, "user provisioned");
        Ok(user_id)
    }

    /// Verify credentials and open a session.
    ///
    /// Wrong secret and unknown user both come back [`AccessError::AuthFailed`]
    /// with no distinguishing signal. A correct secret on a non-active
    /// account is refused with the lifecycle reason; identity is already
    /// proven at that point, so nothing leaks.
    pub fn authenticate(&self, user_id: UserId, secret: &str) -> Result<AuthSuccess, AccessError> {
        if !self.vault.verify(user_id, secret)? {
            return Err(AccessError::AuthFailed);
        }

        let user = self.users.get_user(user_id).map_err(|e| match e {
            StoreError::NotFound => AccessError::AuthFailed,
            other => AccessError::Store(other),
        })?;

        if !user.lifecycle.is_actionable() {
            return Err(DenyReason::AccountNotActive {
                state: user.lifecycle,
            }
            .into());
        }

        let session_id = self.sessions.create(user_id, Utc::now())?;
        let token = self.tokens.issue(user_id, user.role, session_id)?;
        tracing::info!(user_id = %user_id, "authenticated");
        Ok(AuthSuccess { session_id, token })
    }

    /// Exchange a still-valid token for a fresh one on the same session.
    pub fn refresh(&self, token: &str) -> Result<String, AccessError> {
        let (actor, session_id) = self.resolve_actor(token)?;
        if !actor.lifecycle.is_actionable() {
            return Err(DenyReason::AccountNotActive {
                state: actor.lifecycle,
            }
            .into());
        }
        Ok(self.tokens.issue(actor.user_id, actor.role, session_id)?)
    }

    /// Revoke the session the token rides on.
    pub fn logout(&self, token: &str) -> Result<(), AccessError> {
        let claims = self.tokens.verify(token)?;
        self.sessions.revoke(claims.sid)?;
        tracing::info!(user_id = %claims.sub, "logged out");
        Ok(())
    }

    /// The full pre-action chain: token -> session -> lifecycle -> role.
    /// Returns the verified acting identity on `Allow`.
    pub fn authorize_request(
        &self,
        token: &str,
        action: Action,
        resource_owner: Option<UserId>,
    ) -> Result<Actor, AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        self.check(&actor, action, resource_owner)?;
        Ok(actor)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Passwords & lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Change a password. Self-change and admin-change are distinct actions
    /// in the permission table; both revoke every prior session for the
    /// target, the current one included.
    pub fn change_password(
        &self,
        token: &str,
        target: UserId,
        new_secret: &str,
    ) -> Result<(), AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        // Admins hold change-any-password, which covers their own account
        // too; everyone else self-changes under change-own-password.
        let action = if actor.role == Role::Admin {
            Action::ChangeAnyPassword
        } else {
            Action::ChangeOwnPassword
        };
        self.check(&actor, action, Some(target))?;
        self.vault.set_secret(target, new_secret)?;
        Ok(())
    }

    /// Admin-only lifecycle transition (suspend, un-suspend, disable,
    /// reactivate).
    pub fn set_lifecycle(
        &self,
        token: &str,
        target: UserId,
        new_state: LifecycleState,
    ) -> Result<(), AccessError> {
        let actor = self.authorize_request(token, Action::SetLifecycleState, None)?;
        self.lifecycle
            .transition(target, new_state, actor.user_id, actor.role, Utc::now())?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog administration
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_faculty(&self, token: &str, name: &str) -> Result<FacultyId, AccessError> {
        self.authorize_request(token, Action::CreateFaculty, None)?;
        let faculty = Faculty::new(FacultyId::new(), name)?;
        let faculty_id = faculty.faculty_id;
        self.catalog.create_faculty(faculty)?;
        Ok(faculty_id)
    }

    pub fn create_department(
        &self,
        token: &str,
        code: &str,
        name: &str,
        faculty_id: FacultyId,
    ) -> Result<DepartmentId, AccessError> {
        self.authorize_request(token, Action::CreateDepartment, None)?;
        let department = Department::new(DepartmentId::new(), code, name, faculty_id)?;
        let department_id = department.department_id;
        self.catalog.create_department(department)?;
        Ok(department_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_course(
        &self,
        token: &str,
        code: &str,
        title: &str,
        department_id: DepartmentId,
        level: u16,
        unit: u8,
        semester: Semester,
        lecturer_id: UserId,
    ) -> Result<CourseId, AccessError> {
        self.authorize_request(token, Action::CreateCourse, None)?;
        self.require_role(lecturer_id, Role::Lecturer)?;
        let course = Course::new(
            CourseId::new(),
            code,
            title,
            department_id,
            level,
            unit,
            semester,
            lecturer_id,
        )?;
        let course_id = course.course_id;
        self.catalog.create_course(course)?;
        Ok(course_id)
    }

    /// Reassign a course to another lecturer. Admin only; result entry
    /// rights follow the assignment immediately.
    pub fn assign_lecturer(
        &self,
        token: &str,
        course_id: CourseId,
        lecturer_id: UserId,
    ) -> Result<(), AccessError> {
        self.authorize_request(token, Action::AssignLecturer, None)?;
        self.require_role(lecturer_id, Role::Lecturer)?;
        self.catalog.assign_lecturer(course_id, lecturer_id)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Enrollment & coursework
    // ─────────────────────────────────────────────────────────────────────

    /// Enroll a student in a course. Owner-scoped: students enroll
    /// themselves.
    pub fn enroll(
        &self,
        token: &str,
        student_id: UserId,
        course_id: CourseId,
        session_label: &str,
    ) -> Result<(), AccessError> {
        self.authorize_request(token, Action::Enroll, Some(student_id))?;
        self.catalog.enroll(Enrollment {
            student_id,
            course_id,
            session: session_label.to_string(),
            enrolled_at: Utc::now(),
        })?;
        Ok(())
    }

    /// Authorize an assignment submission for the acting student.
    ///
    /// The file payload itself goes to the storage collaborator; the
    /// authority only decides whether the submission may happen.
    pub fn submit_assignment(&self, token: &str, course_id: CourseId) -> Result<(), AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        self.check(&actor, Action::SubmitAssignment, Some(actor.user_id))?;
        if self
            .catalog
            .get_enrollment(actor.user_id, course_id)?
            .is_none()
        {
            return Err(WorkflowError::NotEnrolled.into());
        }
        Ok(())
    }

    /// Roster of a lecturer's own course.
    pub fn view_course_roster(
        &self,
        token: &str,
        course_id: CourseId,
    ) -> Result<Vec<UserId>, AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        let course = self.catalog.get_course(course_id)?;
        self.check(&actor, Action::ViewOwnCourseRoster, Some(course.lecturer_id))?;
        Ok(self.catalog.roster(course_id)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Result workflow
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a score. Course assignment and enrollment are workflow guards
    /// (`NotAssigned` / `NotEnrolled`), not role-layer ownership.
    pub fn enter_result(
        &self,
        token: &str,
        student_id: UserId,
        course_id: CourseId,
        score: f64,
    ) -> Result<ResultId, AccessError> {
        let actor = self.authorize_request(token, Action::EnterResult, None)?;
        Ok(self
            .workflow
            .enter(actor.user_id, student_id, course_id, score, Utc::now())?)
    }

    pub fn edit_result(
        &self,
        token: &str,
        result_id: ResultId,
        new_score: f64,
    ) -> Result<(), AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        let result = self.workflow.get(result_id)?;
        self.check(&actor, Action::EditResult, Some(result.entered_by()))?;
        self.workflow
            .edit(actor.user_id, result_id, new_score, Utc::now())?;
        Ok(())
    }

    /// Submit a draft for approval. The workflow refuses submitters who did
    /// not enter the draft (`NotOwner`).
    pub fn submit_result(&self, token: &str, result_id: ResultId) -> Result<(), AccessError> {
        let actor = self.authorize_request(token, Action::SubmitResult, None)?;
        self.workflow
            .submit(actor.user_id, result_id, Utc::now())?;
        Ok(())
    }

    pub fn approve_result(&self, token: &str, result_id: ResultId) -> Result<(), AccessError> {
        let actor = self.authorize_request(token, Action::ApproveResult, None)?;
        self.workflow
            .approve(actor.user_id, result_id, Utc::now())?;
        Ok(())
    }

    pub fn reject_result(
        &self,
        token: &str,
        result_id: ResultId,
        reason: &str,
    ) -> Result<(), AccessError> {
        let actor = self.authorize_request(token, Action::RejectResult, None)?;
        self.workflow
            .reject(actor.user_id, result_id, reason, Utc::now())?;
        Ok(())
    }

    pub fn reopen_result(&self, token: &str, result_id: ResultId) -> Result<(), AccessError> {
        let actor = self.authorize_request(token, Action::ReopenResult, None)?;
        self.workflow.reopen(actor.user_id, result_id, Utc::now())?;
        Ok(())
    }

    /// The student-visible projection of their own result for a course:
    /// `Some(score, grade)` iff the result is approved, `None` otherwise.
    pub fn view_own_result(
        &self,
        token: &str,
        course_id: CourseId,
    ) -> Result<Option<ResultView>, AccessError> {
        let (actor, _session_id) = self.resolve_actor(token)?;
        self.check(&actor, Action::ViewOwnResult, Some(actor.user_id))?;
        Ok(self.workflow.student_view(actor.user_id, course_id)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn create_account(
        &self,
        user_id: UserId,
        role: Role,
        secret: &str,
    ) -> Result<(), AccessError> {
        let password_hash = hash_password(secret)
            .map_err(|e| AccessError::Store(StoreError::unavailable(e.to_string())))?;
        self.users.create_user(UserRecord {
            user_id,
            role,
            password_hash,
            lifecycle: LifecycleState::Active,
            created_at: Utc::now(),
        })?;
        Ok(())
    }

    /// Resolve the acting identity: verify the token, confirm the session is
    /// live and belongs to the token's subject, slide the idle window, and
    /// read the user's *current* role and lifecycle from the store, so a
    /// stale token never outruns a lifecycle change.
    fn resolve_actor(&self, token: &str) -> Result<(Actor, SessionId), AccessError> {
        let claims = self.tokens.verify(token)?;
        let now = Utc::now();

        let record = self.sessions.get(claims.sid)?;
        self.policy.check(record.as_ref(), now)?;
        let Some(record) = record else {
            return Err(SessionError::Unknown.into());
        };
        if record.user_id != claims.sub {
            return Err(SessionError::Unknown.into());
        }
        self.sessions.touch(claims.sid, now)?;

        let user = self.users.get_user(claims.sub).map_err(|e| match e {
            StoreError::NotFound => AccessError::Session(SessionError::Unknown),
            other => AccessError::Store(other),
        })?;

        Ok((
            Actor {
                user_id: user.user_id,
                role: user.role,
                lifecycle: user.lifecycle,
            },
            claims.sid,
        ))
    }

    fn check(
        &self,
        actor: &Actor,
        action: Action,
        resource_owner: Option<UserId>,
    ) -> Result<(), AccessError> {
        match authorize(actor, action, resource_owner) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::warn!(
                    actor_id = %actor.user_id,
                    action = %action,
                    reason = %reason,
                    "request denied"
                );
                Err(reason.into())
            }
        }
    }

    fn require_role(&self, user_id: UserId, role: Role) -> Result<(), AccessError> {
        let user = self.users.get_user(user_id)?;
        if user.role != role {
            return Err(registra_core::DomainError::validation(format!(
                "user {user_id} is not a {role}"
            ))
            .into());
        }
        Ok(())
    }
}
