//! End-to-end exercises of the access gateway over in-memory stores: the
//! full token -> session -> lifecycle -> role chain, the result approval
//! workflow, and the audit trail.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use registra_auth::{
    DenyReason, LifecycleState, Role, SessionError, SessionPolicy, TokenAuthority, TokenClaims,
    TokenError, TransitionError, UserRecord, UserStore, hash_password,
};
use registra_core::{SessionId, UserId};
use registra_events::{AuditLog, InMemoryAuditLog};
use registra_gateway::{AccessError, AccessGateway};
use registra_infra::{
    InMemoryCatalogStore, InMemoryResultStore, InMemorySessionStore, InMemoryUserStore,
};
use registra_academics::{CourseId, DepartmentId, Semester};
use registra_results::{Grade, WorkflowError};

const SECRET: &str = "integration-test-signing-secret";

type Gateway = AccessGateway<
    InMemoryUserStore,
    InMemorySessionStore,
    InMemoryCatalogStore,
    InMemoryResultStore,
    InMemoryAuditLog,
>;

struct TestEnv {
    gateway: Arc<Gateway>,
    audit: Arc<InMemoryAuditLog>,
    admin: UserId,
    admin_token: String,
    lecturer: UserId,
    lecturer_token: String,
    student: UserId,
    student_token: String,
    department_id: DepartmentId,
    course_id: CourseId,
}

fn env() -> TestEnv {
    registra_observability::init();

    let users = Arc::new(InMemoryUserStore::new());
    let sessions = Arc::new(InMemorySessionStore::new(SessionPolicy::default()));
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let results = Arc::new(InMemoryResultStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());

    let tokens = TokenAuthority::new(SECRET, ChronoDuration::minutes(15)).unwrap();
    let gateway = Arc::new(AccessGateway::new(
        tokens,
        SessionPolicy::default(),
        users.clone(),
        sessions,
        catalog,
        results,
        audit.clone(),
    ));

    // The first admin is seeded straight into the directory (someone has to
    // bootstrap provisioning); everyone else goes through the gateway.
    let admin = UserId::new();
    users
        .create_user(UserRecord {
            user_id: admin,
            role: Role::Admin,
            password_hash: hash_password("admin-pass").unwrap(),
            lifecycle: LifecycleState::Active,
            created_at: Utc::now(),
        })
        .unwrap();
    let admin_token = gateway.authenticate(admin, "admin-pass").unwrap().token;

    let lecturer = gateway
        .provision_user(&admin_token, Role::Lecturer, "lecturer-pass")
        .unwrap();
    let lecturer_token = gateway.authenticate(lecturer, "lecturer-pass").unwrap().token;

    let student = gateway.register_student("student-pass").unwrap();
    let student_token = gateway.authenticate(student, "student-pass").unwrap().token;

    let faculty_id = gateway.create_faculty(&admin_token, "Science").unwrap();
    let department_id = gateway
        .create_department(&admin_token, "CSC", "Computer Science", faculty_id)
        .unwrap();
    let course_id = gateway
        .create_course(
            &admin_token,
            "CSC301",
            "Systems Programming",
            department_id,
            300,
            3,
            Semester::Harmattan,
            lecturer,
        )
        .unwrap();
    gateway
        .enroll(&student_token, student, course_id, "2024/2025")
        .unwrap();

    TestEnv {
        gateway,
        audit,
        admin,
        admin_token,
        lecturer,
        lecturer_token,
        student,
        student_token,
        department_id,
        course_id,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials & sessions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn wrong_secret_and_unknown_user_are_indistinguishable() {
    let env = env();

    let wrong_secret = env
        .gateway
        .authenticate(env.student, "not-the-password")
        .unwrap_err();
    let unknown_user = env
        .gateway
        .authenticate(UserId::new(), "anything")
        .unwrap_err();

    assert_eq!(wrong_secret, AccessError::AuthFailed);
    assert_eq!(unknown_user, AccessError::AuthFailed);
}

#[test]
fn password_change_invalidates_every_prior_session() {
    let env = env();

    // A second live session for the same student.
    let second = env.gateway.authenticate(env.student, "student-pass").unwrap();

    env.gateway
        .change_password(&env.student_token, env.student, "rotated-pass")
        .unwrap();

    // Both prior sessions are dead, the one that made the change included.
    for token in [&env.student_token, &second.token] {
        assert_eq!(
            env.gateway.view_own_result(token, env.course_id).unwrap_err(),
            AccessError::Session(SessionError::Revoked)
        );
    }

    // Old secret gone, new secret works.
    assert_eq!(
        env.gateway
            .authenticate(env.student, "student-pass")
            .unwrap_err(),
        AccessError::AuthFailed
    );
    env.gateway.authenticate(env.student, "rotated-pass").unwrap();
}

#[test]
fn password_changes_follow_the_permission_table() {
    let env = env();

    // A lecturer cannot rotate someone else's secret.
    assert_eq!(
        env.gateway
            .change_password(&env.lecturer_token, env.student, "hijacked")
            .unwrap_err(),
        AccessError::Denied(DenyReason::NotOwner)
    );

    // An admin rotates anyone's, their own included.
    env.gateway
        .change_password(&env.admin_token, env.student, "admin-set-pass")
        .unwrap();
    env.gateway
        .change_password(&env.admin_token, env.admin, "admin-rotated")
        .unwrap();

    env.gateway.authenticate(env.student, "admin-set-pass").unwrap();
    env.gateway.authenticate(env.admin, "admin-rotated").unwrap();
}

#[test]
fn token_failure_modes_are_distinct() {
    let env = env();

    // Garbage.
    assert_eq!(
        env.gateway
            .view_own_result("not-a-token", env.course_id)
            .unwrap_err(),
        AccessError::Token(TokenError::Malformed)
    );

    // Signed by someone else.
    let foreign = TokenAuthority::new("a-completely-different-secret", ChronoDuration::minutes(15))
        .unwrap()
        .issue(env.student, Role::Student, SessionId::new())
        .unwrap();
    assert_eq!(
        env.gateway.view_own_result(&foreign, env.course_id).unwrap_err(),
        AccessError::Token(TokenError::SignatureMismatch)
    );

    // Correct signature, expired: rejected regardless of session validity.
    let live = env.gateway.authenticate(env.student, "student-pass").unwrap();
    let now = Utc::now();
    let expired_claims = TokenClaims {
        sub: env.student,
        role: Role::Student,
        sid: live.session_id,
        iat: (now - ChronoDuration::minutes(30)).timestamp(),
        exp: (now - ChronoDuration::minutes(15)).timestamp(),
    };
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &expired_claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    assert_eq!(
        env.gateway.view_own_result(&expired, env.course_id).unwrap_err(),
        AccessError::Token(TokenError::Expired)
    );
}

#[test]
fn refresh_rides_the_same_session_and_logout_kills_it() {
    let env = env();

    let fresh = env.gateway.refresh(&env.student_token).unwrap();
    assert!(env.gateway.view_own_result(&fresh, env.course_id).is_ok());

    env.gateway.logout(&fresh).unwrap();

    // Both tokens rode the same session; logout kills them together.
    for token in [&fresh, &env.student_token] {
        assert_eq!(
            env.gateway.view_own_result(token, env.course_id).unwrap_err(),
            AccessError::Session(SessionError::Revoked)
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn suspended_student_with_valid_token_is_denied_everything() {
    let env = env();

    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Suspended)
        .unwrap();

    // The token and session are intact; the lifecycle gate fires.
    assert_eq!(
        env.gateway
            .view_own_result(&env.student_token, env.course_id)
            .unwrap_err(),
        AccessError::Denied(DenyReason::AccountNotActive {
            state: LifecycleState::Suspended
        })
    );
    assert_eq!(
        env.gateway
            .enroll(&env.student_token, env.student, env.course_id, "2024/2025")
            .unwrap_err(),
        AccessError::Denied(DenyReason::AccountNotActive {
            state: LifecycleState::Suspended
        })
    );

    // Un-suspension restores access.
    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Active)
        .unwrap();
    assert!(
        env.gateway
            .view_own_result(&env.student_token, env.course_id)
            .is_ok()
    );
}

#[test]
fn disabling_revokes_sessions_immediately() {
    let env = env();

    env.gateway
        .set_lifecycle(&env.admin_token, env.lecturer, LifecycleState::Disabled)
        .unwrap();

    // Not just the lifecycle flag: the materialized session state agrees.
    assert_eq!(
        env.gateway
            .view_course_roster(&env.lecturer_token, env.course_id)
            .unwrap_err(),
        AccessError::Session(SessionError::Revoked)
    );

    // And logging back in is refused with the lifecycle reason.
    assert_eq!(
        env.gateway
            .authenticate(env.lecturer, "lecturer-pass")
            .unwrap_err(),
        AccessError::Denied(DenyReason::AccountNotActive {
            state: LifecycleState::Disabled
        })
    );
}

#[test]
fn lifecycle_edges_are_enforced() {
    let env = env();

    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Disabled)
        .unwrap();

    // disabled -> suspended is not an edge; reactivate first.
    assert_eq!(
        env.gateway
            .set_lifecycle(&env.admin_token, env.student, LifecycleState::Suspended)
            .unwrap_err(),
        AccessError::Lifecycle(TransitionError::InvalidEdge {
            from: LifecycleState::Disabled,
            to: LifecycleState::Suspended,
        })
    );

    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Active)
        .unwrap();
}

#[test]
fn lifecycle_is_admin_only() {
    let env = env();
    assert_eq!(
        env.gateway
            .set_lifecycle(&env.lecturer_token, env.student, LifecycleState::Suspended)
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission table
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn provisioning_is_admin_only() {
    let env = env();
    assert_eq!(
        env.gateway
            .provision_user(&env.student_token, Role::Lecturer, "pw")
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );
}

#[test]
fn students_enroll_themselves_only() {
    let env = env();
    let other_student = env.gateway.register_student("other-pass").unwrap();

    assert_eq!(
        env.gateway
            .enroll(&env.student_token, other_student, env.course_id, "2024/2025")
            .unwrap_err(),
        AccessError::Denied(DenyReason::NotOwner)
    );
}

#[test]
fn roster_is_visible_to_the_assigned_lecturer_only() {
    let env = env();

    assert_eq!(
        env.gateway
            .view_course_roster(&env.lecturer_token, env.course_id)
            .unwrap(),
        vec![env.student]
    );

    let other = env
        .gateway
        .provision_user(&env.admin_token, Role::Lecturer, "other-pass")
        .unwrap();
    let other_token = env.gateway.authenticate(other, "other-pass").unwrap().token;
    assert_eq!(
        env.gateway
            .view_course_roster(&other_token, env.course_id)
            .unwrap_err(),
        AccessError::Denied(DenyReason::NotOwner)
    );

    assert_eq!(
        env.gateway
            .view_course_roster(&env.student_token, env.course_id)
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );
}

#[test]
fn assignment_submission_requires_enrollment() {
    let env = env();

    env.gateway
        .submit_assignment(&env.student_token, env.course_id)
        .unwrap();

    let unenrolled = env.gateway.register_student("pw").unwrap();
    let unenrolled_token = env.gateway.authenticate(unenrolled, "pw").unwrap().token;
    assert_eq!(
        env.gateway
            .submit_assignment(&unenrolled_token, env.course_id)
            .unwrap_err(),
        AccessError::Workflow(WorkflowError::NotEnrolled)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Result workflow
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn the_full_approval_path_and_its_guards() {
    let env = env();

    let result_id = env
        .gateway
        .enter_result(&env.lecturer_token, env.student, env.course_id, 85.0)
        .unwrap();

    // Draft: hidden from the student.
    assert_eq!(
        env.gateway
            .view_own_result(&env.student_token, env.course_id)
            .unwrap(),
        None
    );

    env.gateway
        .submit_result(&env.lecturer_token, result_id)
        .unwrap();
    env.gateway
        .approve_result(&env.admin_token, result_id)
        .unwrap();

    // Approved: the student sees score and grade.
    let view = env
        .gateway
        .view_own_result(&env.student_token, env.course_id)
        .unwrap()
        .expect("approved result must be visible");
    assert_eq!(view.score, 85.0);
    assert_eq!(view.grade, Grade::A);

    // Rejecting an already-approved result loses with WRONG_STATE.
    assert!(matches!(
        env.gateway
            .reject_result(&env.admin_token, result_id, "too late")
            .unwrap_err(),
        AccessError::Workflow(WorkflowError::WrongState { .. })
    ));
}

#[test]
fn unassigned_lecturer_fails_not_assigned() {
    let env = env();

    let other = env
        .gateway
        .provision_user(&env.admin_token, Role::Lecturer, "other-pass")
        .unwrap();
    let other_token = env.gateway.authenticate(other, "other-pass").unwrap().token;

    assert_eq!(
        env.gateway
            .enter_result(&other_token, env.student, env.course_id, 50.0)
            .unwrap_err(),
        AccessError::Workflow(WorkflowError::NotAssigned)
    );
}

#[test]
fn students_and_admins_cannot_enter_results() {
    let env = env();

    assert_eq!(
        env.gateway
            .enter_result(&env.student_token, env.student, env.course_id, 99.0)
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );
    assert_eq!(
        env.gateway
            .enter_result(&env.admin_token, env.student, env.course_id, 99.0)
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );
}

#[test]
fn reopened_results_travel_the_full_path_again() {
    let env = env();

    let result_id = env
        .gateway
        .enter_result(&env.lecturer_token, env.student, env.course_id, 71.0)
        .unwrap();
    env.gateway
        .submit_result(&env.lecturer_token, result_id)
        .unwrap();
    env.gateway
        .approve_result(&env.admin_token, result_id)
        .unwrap();

    env.gateway
        .reopen_result(&env.admin_token, result_id)
        .unwrap();

    // Hidden again, and not directly re-approvable from draft.
    assert_eq!(
        env.gateway
            .view_own_result(&env.student_token, env.course_id)
            .unwrap(),
        None
    );
    assert!(matches!(
        env.gateway
            .approve_result(&env.admin_token, result_id)
            .unwrap_err(),
        AccessError::Workflow(WorkflowError::WrongState { .. })
    ));

    // The full path restores visibility.
    env.gateway
        .submit_result(&env.lecturer_token, result_id)
        .unwrap();
    env.gateway
        .approve_result(&env.admin_token, result_id)
        .unwrap();
    assert!(
        env.gateway
            .view_own_result(&env.student_token, env.course_id)
            .unwrap()
            .is_some()
    );
}

#[test]
fn concurrent_approve_and_reject_admit_one_winner() {
    let env = env();

    let result_id = env
        .gateway
        .enter_result(&env.lecturer_token, env.student, env.course_id, 64.0)
        .unwrap();
    env.gateway
        .submit_result(&env.lecturer_token, result_id)
        .unwrap();

    let g1 = env.gateway.clone();
    let g2 = env.gateway.clone();
    let t1 = env.admin_token.clone();
    let t2 = env.admin_token.clone();

    let approve = std::thread::spawn(move || g1.approve_result(&t1, result_id));
    let reject = std::thread::spawn(move || g2.reject_result(&t2, result_id, "hold on"));

    let outcomes = [approve.join().unwrap(), reject.join().unwrap()];
    assert_eq!(
        outcomes.iter().filter(|o| o.is_ok()).count(),
        1,
        "exactly one transition must win: {outcomes:?}"
    );
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(AccessError::Workflow(WorkflowError::WrongState { .. }))
    )));
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit trail
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn sensitive_transitions_land_in_the_audit_log() {
    let env = env();
    let started = Utc::now();

    // Two lifecycle transitions on the student.
    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Suspended)
        .unwrap();
    env.gateway
        .set_lifecycle(&env.admin_token, env.student, LifecycleState::Active)
        .unwrap();

    let lifecycle_trail = env.audit.by_target(env.student.into()).unwrap();
    assert_eq!(lifecycle_trail.len(), 2);
    assert!(lifecycle_trail.iter().all(|e| e.actor_id == env.admin));
    assert_eq!(lifecycle_trail[0].to_state, "suspended");
    assert_eq!(lifecycle_trail[1].to_state, "active");

    // Approve + reopen on a result.
    let result_id = env
        .gateway
        .enter_result(&env.lecturer_token, env.student, env.course_id, 77.0)
        .unwrap();
    env.gateway
        .submit_result(&env.lecturer_token, result_id)
        .unwrap();
    env.gateway
        .approve_result(&env.admin_token, result_id)
        .unwrap();
    env.gateway
        .reopen_result(&env.admin_token, result_id)
        .unwrap();

    let result_trail = env.audit.by_target(result_id.into()).unwrap();
    assert_eq!(result_trail.len(), 2);
    assert_eq!(result_trail[0].to_state, "approved");
    assert_eq!(result_trail[1].to_state, "draft");
    assert!(
        result_trail[1]
            .detail
            .as_deref()
            .unwrap()
            .contains(&env.admin.to_string())
    );

    // Everything above falls in the queried time range.
    let ranged = env
        .audit
        .in_range(started, Utc::now() + ChronoDuration::seconds(1))
        .unwrap();
    assert!(ranged.len() >= 4);
}

#[test]
fn catalog_administration_is_admin_gated() {
    let env = env();

    assert_eq!(
        env.gateway
            .create_course(
                &env.lecturer_token,
                "CSC999",
                "Rogue Course",
                env.department_id,
                400,
                2,
                Semester::Rain,
                env.lecturer,
            )
            .unwrap_err(),
        AccessError::Denied(DenyReason::RoleForbidden)
    );

    // Reassignment moves entry rights immediately.
    let replacement = env
        .gateway
        .provision_user(&env.admin_token, Role::Lecturer, "repl-pass")
        .unwrap();
    let replacement_token = env
        .gateway
        .authenticate(replacement, "repl-pass")
        .unwrap()
        .token;

    env.gateway
        .assign_lecturer(&env.admin_token, env.course_id, replacement)
        .unwrap();

    assert_eq!(
        env.gateway
            .enter_result(&env.lecturer_token, env.student, env.course_id, 44.0)
            .unwrap_err(),
        AccessError::Workflow(WorkflowError::NotAssigned)
    );
    env.gateway
        .enter_result(&replacement_token, env.student, env.course_id, 44.0)
        .unwrap();
}
