use core::str::FromStr;

use serde::{Deserialize, Serialize};

use registra_core::DomainError;

/// Actor role.
///
/// The role set is closed on purpose: the permission matrix in
/// [`crate::actions`] must stay auditable in one place, so roles are a fixed
/// enum rather than opaque strings or subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Lecturer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Lecturer => "lecturer",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "lecturer" => Ok(Role::Lecturer),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
