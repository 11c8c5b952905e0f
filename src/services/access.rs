//! Who may look at or change an attempt.
//!
//! Self access: the attempt's student record links to the caller's user id.
//! Teacher access: the caller teaches a classroom that has the student enrolled
//! and the test assigned. Reads accept either; writes accept self access only.

use crate::db::models::{Student, TestAttempt, User};
use crate::repositories::{AttemptStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccessMode {
    Read,
    Mutate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Owner,
    Teacher,
    Denied,
}

impl Access {
    pub(crate) fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Student ids and user ids live in different spaces; only `user_id` links them.
pub(crate) fn is_self(student: &Student, user: &User) -> bool {
    student.user_id == user.id
}

pub(crate) async fn attempt_access(
    store: &dyn AttemptStore,
    user: &User,
    attempt: &TestAttempt,
    mode: AccessMode,
) -> Result<Access, StoreError> {
    if let Some(student) = store.find_student(&attempt.student_id).await? {
        if is_self(&student, user) {
            return Ok(Access::Owner);
        }
    }

    if mode == AccessMode::Mutate {
        return Ok(Access::Denied);
    }

    if store.teaches_student_for_test(&user.id, &attempt.student_id, &attempt.test_id).await? {
        return Ok(Access::Teacher);
    }

    Ok(Access::Denied)
}
