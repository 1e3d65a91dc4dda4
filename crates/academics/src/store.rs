//! The catalog storage seam.

use std::sync::Arc;

use registra_core::{StoreError, UserId};

use crate::catalog::{Course, CourseId, Department, Enrollment, Faculty};

/// Catalog reads and writes the authority needs.
///
/// Mutations fail with `Conflict` on duplicates (course code, enrollment
/// pair); lookups fail with `NotFound` only where absence is exceptional.
/// Enrollment lookups return `Ok(None)` because absence is an answer the
/// workflow guards on.
pub trait CatalogStore: Send + Sync {
    fn create_faculty(&self, faculty: Faculty) -> Result<(), StoreError>;

    fn create_department(&self, department: Department) -> Result<(), StoreError>;

    fn create_course(&self, course: Course) -> Result<(), StoreError>;

    fn get_course(&self, course_id: CourseId) -> Result<Course, StoreError>;

    /// Reassign the lecturer for a course. Admin-gated by the caller.
    fn assign_lecturer(&self, course_id: CourseId, lecturer_id: UserId) -> Result<(), StoreError>;

    /// Record an enrollment. Fails with `Conflict` if the (student, course)
    /// pair already exists.
    fn enroll(&self, enrollment: Enrollment) -> Result<(), StoreError>;

    fn get_enrollment(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Enrolled students for a course.
    fn roster(&self, course_id: CourseId) -> Result<Vec<UserId>, StoreError>;
}

impl<C> CatalogStore for Arc<C>
where
    C: CatalogStore + ?Sized,
{
    fn create_faculty(&self, faculty: Faculty) -> Result<(), StoreError> {
        (**self).create_faculty(faculty)
    }

    fn create_department(&self, department: Department) -> Result<(), StoreError> {
        (**self).create_department(department)
    }

    fn create_course(&self, course: Course) -> Result<(), StoreError> {
        (**self).create_course(course)
    }

    fn get_course(&self, course_id: CourseId) -> Result<Course, StoreError> {
        (**self).get_course(course_id)
    }

    fn assign_lecturer(&self, course_id: CourseId, lecturer_id: UserId) -> Result<(), StoreError> {
        (**self).assign_lecturer(course_id, lecturer_id)
    }

    fn enroll(&self, enrollment: Enrollment) -> Result<(), StoreError> {
        (**self).enroll(enrollment)
    }

    fn get_enrollment(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StoreError> {
        (**self).get_enrollment(student_id, course_id)
    }

    fn roster(&self, course_id: CourseId) -> Result<Vec<UserId>, StoreError> {
        (**self).roster(course_id)
    }
}
