//! The fixed permission matrix.
//!
//! Every protected operation maps to exactly one [`Action`]. Which roles may
//! perform which actions is a static table here, not behavior scattered over
//! request handlers; the whole matrix is auditable on this page.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// A protected operation, named by what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    // student
    RegisterSelf,
    Enroll,
    SubmitAssignment,
    ViewOwnResult,
    ChangeOwnPassword,

    // lecturer
    EnterResult,
    EditResult,
    SubmitResult,
    ViewOwnCourseRoster,

    // admin
    CreateCourse,
    AssignLecturer,
    CreateDepartment,
    CreateFaculty,
    ApproveResult,
    RejectResult,
    ReopenResult,
    SetLifecycleState,
    ChangeAnyPassword,
    ProvisionUser,
}

const STUDENT_ACTIONS: &[Action] = &[
    Action::RegisterSelf,
    Action::Enroll,
    Action::SubmitAssignment,
    Action::ViewOwnResult,
    Action::ChangeOwnPassword,
];

const LECTURER_ACTIONS: &[Action] = &[
    Action::EnterResult,
    Action::EditResult,
    Action::SubmitResult,
    Action::ViewOwnCourseRoster,
    Action::ChangeOwnPassword,
];

const ADMIN_ACTIONS: &[Action] = &[
    Action::CreateCourse,
    Action::AssignLecturer,
    Action::CreateDepartment,
    Action::CreateFaculty,
    Action::ApproveResult,
    Action::RejectResult,
    Action::ReopenResult,
    Action::SetLifecycleState,
    Action::ChangeAnyPassword,
    Action::ProvisionUser,
];

/// The permitted action set for a role.
pub fn permitted_actions(role: Role) -> &'static [Action] {
    match role {
        Role::Student => STUDENT_ACTIONS,
        Role::Lecturer => LECTURER_ACTIONS,
        Role::Admin => ADMIN_ACTIONS,
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::RegisterSelf => "register-self",
            Action::Enroll => "enroll",
            Action::SubmitAssignment => "submit-assignment",
            Action::ViewOwnResult => "view-own-result",
            Action::ChangeOwnPassword => "change-own-password",
            Action::EnterResult => "enter-result",
            Action::EditResult => "edit-result",
            Action::SubmitResult => "submit-result",
            Action::ViewOwnCourseRoster => "view-own-course-roster",
            Action::CreateCourse => "create-course",
            Action::AssignLecturer => "assign-lecturer",
            Action::CreateDepartment => "create-department",
            Action::CreateFaculty => "create-faculty",
            Action::ApproveResult => "approve-result",
            Action::RejectResult => "reject-result",
            Action::ReopenResult => "reopen-result",
            Action::SetLifecycleState => "set-lifecycle-state",
            Action::ChangeAnyPassword => "change-any-password",
            Action::ProvisionUser => "provision-user",
        }
    }

    /// Whether the action only applies to resources owned by the actor.
    ///
    /// Owner-scoped actions require a `resource_owner` at authorization time;
    /// admins satisfy ownership implicitly. Entering and submitting results
    /// are deliberately absent: their guards (course assignment, who entered
    /// the draft) belong to the workflow, which reports `NotAssigned` /
    /// `NotOwner` with the course context in hand.
    pub fn is_owner_scoped(self) -> bool {
        matches!(
            self,
            Action::Enroll
                | Action::SubmitAssignment
                | Action::ViewOwnResult
                | Action::ChangeOwnPassword
                | Action::EditResult
                | Action::ViewOwnCourseRoster
        )
    }

    pub fn is_permitted(self, role: Role) -> bool {
        permitted_actions(role).contains(&self)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
