use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use registra_core::{AggregateId, DomainError, UserId};

/// Faculty identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacultyId(pub AggregateId);

/// Department identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub AggregateId);

/// Course identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub AggregateId);

macro_rules! impl_catalog_id {
    ($t:ty) => {
        impl $t {
            pub fn new() -> Self {
                Self(AggregateId::new())
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for uuid::Uuid {
            fn from(value: $t) -> Self {
                value.0.into()
            }
        }
    };
}

impl_catalog_id!(FacultyId);
impl_catalog_id!(DepartmentId);
impl_catalog_id!(CourseId);

/// Academic semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Harmattan,
    Rain,
}

impl Semester {
    pub fn as_str(self) -> &'static str {
        match self {
            Semester::Harmattan => "harmattan",
            Semester::Rain => "rain",
        }
    }
}

impl core::fmt::Display for Semester {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "harmattan" => Ok(Semester::Harmattan),
            "rain" => Ok(Semester::Rain),
            other => Err(DomainError::validation(format!("unknown semester '{other}'"))),
        }
    }
}

/// A faculty groups departments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub faculty_id: FacultyId,
    pub name: String,
}

impl Faculty {
    pub fn new(faculty_id: FacultyId, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("faculty name cannot be empty"));
        }
        Ok(Self {
            faculty_id,
            name: name.trim().to_string(),
        })
    }
}

/// A department within a faculty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub department_id: DepartmentId,
    /// Short code, e.g. "CSC".
    pub code: String,
    pub name: String,
    pub faculty_id: FacultyId,
}

impl Department {
    pub fn new(
        department_id: DepartmentId,
        code: impl Into<String>,
        name: impl Into<String>,
        faculty_id: FacultyId,
    ) -> Result<Self, DomainError> {
        let code = code.into();
        let name = name.into();
        if code.trim().is_empty() {
            return Err(DomainError::validation("department code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("department name cannot be empty"));
        }
        Ok(Self {
            department_id,
            code: code.trim().to_uppercase(),
            name: name.trim().to_string(),
            faculty_id,
        })
    }
}

/// A course offering.
///
/// The lecturer assignment is the field the result workflow guards on; it is
/// set at creation and reassignable only through the admin path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    /// Course code, e.g. "CSC301".
    pub code: String,
    pub title: String,
    pub department_id: DepartmentId,
    /// Study level (100, 200, ...).
    pub level: u16,
    /// Credit units.
    pub unit: u8,
    pub semester: Semester,
    pub lecturer_id: UserId,
}

impl Course {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_id: CourseId,
        code: impl Into<String>,
        title: impl Into<String>,
        department_id: DepartmentId,
        level: u16,
        unit: u8,
        semester: Semester,
        lecturer_id: UserId,
    ) -> Result<Self, DomainError> {
        let code = code.into();
        let title = title.into();
        if code.trim().is_empty() {
            return Err(DomainError::validation("course code cannot be empty"));
        }
        if title.trim().is_empty() {
            return Err(DomainError::validation("course title cannot be empty"));
        }
        if unit == 0 {
            return Err(DomainError::validation("course unit must be positive"));
        }
        Ok(Self {
            course_id,
            code: code.trim().to_uppercase(),
            title: title.trim().to_string(),
            department_id,
            level,
            unit,
            semester,
            lecturer_id,
        })
    }
}

/// A student's enrollment in a course, unique per (student, course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: UserId,
    pub course_id: CourseId,
    /// Academic session label, e.g. "2024/2025".
    pub session: String,
    pub enrolled_at: DateTime<Utc>,
}
