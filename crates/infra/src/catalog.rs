//! In-memory academic catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use registra_academics::{
    CatalogStore, Course, CourseId, Department, DepartmentId, Enrollment, Faculty, FacultyId,
};
use registra_core::{StoreError, UserId};

#[derive(Debug, Default)]
struct Inner {
    faculties: HashMap<FacultyId, Faculty>,
    departments: HashMap<DepartmentId, Department>,
    courses: HashMap<CourseId, Course>,
    enrollments: HashMap<(UserId, CourseId), Enrollment>,
}

/// In-memory [`CatalogStore`].
///
/// Intended for tests/dev. A single lock keeps the referential checks
/// (department exists, course exists) atomic with the writes they guard.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Inner>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::unavailable("catalog lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::unavailable("catalog lock poisoned"))
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn create_faculty(&self, faculty: Faculty) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.faculties.values().any(|f| f.name == faculty.name) {
            return Err(StoreError::conflict(format!(
                "faculty '{}' already exists",
                faculty.name
            )));
        }
        inner.faculties.insert(faculty.faculty_id, faculty);
        Ok(())
    }

    fn create_department(&self, department: Department) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.faculties.contains_key(&department.faculty_id) {
            return Err(StoreError::NotFound);
        }
        if inner.departments.values().any(|d| d.code == department.code) {
            return Err(StoreError::conflict(format!(
                "department '{}' already exists",
                department.code
            )));
        }
        inner.departments.insert(department.department_id, department);
        Ok(())
    }

    fn create_course(&self, course: Course) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.departments.contains_key(&course.department_id) {
            return Err(StoreError::NotFound);
        }
        if inner.courses.values().any(|c| c.code == course.code) {
            return Err(StoreError::conflict(format!(
                "course '{}' already exists",
                course.code
            )));
        }
        inner.courses.insert(course.course_id, course);
        Ok(())
    }

    fn get_course(&self, course_id: CourseId) -> Result<Course, StoreError> {
        self.read()?
            .courses
            .get(&course_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn assign_lecturer(&self, course_id: CourseId, lecturer_id: UserId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let course = inner.courses.get_mut(&course_id).ok_or(StoreError::NotFound)?;
        course.lecturer_id = lecturer_id;
        Ok(())
    }

    fn enroll(&self, enrollment: Enrollment) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.courses.contains_key(&enrollment.course_id) {
            return Err(StoreError::NotFound);
        }
        let key = (enrollment.student_id, enrollment.course_id);
        if inner.enrollments.contains_key(&key) {
            return Err(StoreError::conflict("student already enrolled in course"));
        }
        inner.enrollments.insert(key, enrollment);
        Ok(())
    }

    fn get_enrollment(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self.read()?.enrollments.get(&(student_id, course_id)).cloned())
    }

    fn roster(&self, course_id: CourseId) -> Result<Vec<UserId>, StoreError> {
        let inner = self.read()?;
        if !inner.courses.contains_key(&course_id) {
            return Err(StoreError::NotFound);
        }
        Ok(inner
            .enrollments
            .keys()
            .filter(|(_, c)| *c == course_id)
            .map(|(s, _)| *s)
            .collect())
    }
}
