//! `registra-academics` — faculties, departments, courses and enrollments.
//!
//! These are the records the authority's guards read: result entry checks
//! course assignment and enrollment against this catalog. The catalog itself
//! is deliberately thin; listing/reporting queries live with the storage
//! collaborator, outside the authority.

pub mod catalog;
pub mod store;

pub use catalog::{Course, CourseId, Department, DepartmentId, Enrollment, Faculty, FacultyId, Semester};
pub use store::CatalogStore;
