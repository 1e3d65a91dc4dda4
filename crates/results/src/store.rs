//! The result storage seam.

use std::sync::Arc;

use registra_academics::CourseId;
use registra_core::{ExpectedVersion, StoreError, UserId};

use crate::result::{ResultId, StudentResult};

/// Result reads and writes.
///
/// `commit` carries an [`ExpectedVersion`]: conflicting transitions on the
/// same result race to commit, the store accepts exactly one, and the loser
/// re-reads. That is the serialization point the workflow relies on.
pub trait ResultStore: Send + Sync {
    fn get(&self, result_id: ResultId) -> Result<StudentResult, StoreError>;

    fn find_by_student_course(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<StudentResult>, StoreError>;

    /// Insert a brand-new result. Fails with `Conflict` if the id or the
    /// (student, course) pair already exists.
    fn insert(&self, result: StudentResult) -> Result<(), StoreError>;

    /// Replace an existing result iff its stored version matches `expected`.
    fn commit(&self, result: StudentResult, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<R> ResultStore for Arc<R>
where
    R: ResultStore + ?Sized,
{
    fn get(&self, result_id: ResultId) -> Result<StudentResult, StoreError> {
        (**self).get(result_id)
    }

    fn find_by_student_course(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<StudentResult>, StoreError> {
        (**self).find_by_student_course(student_id, course_id)
    }

    fn insert(&self, result: StudentResult) -> Result<(), StoreError> {
        (**self).insert(result)
    }

    fn commit(&self, result: StudentResult, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).commit(result, expected)
    }
}
