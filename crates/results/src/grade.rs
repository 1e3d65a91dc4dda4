//! Score validation and grade banding.

use serde::{Deserialize, Serialize};

use registra_core::DomainError;

/// Letter grade banded from a score.
///
/// Ordered best-first: `Grade::A < Grade::F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    /// Band a score into a grade: A >= 70, B >= 60, C >= 50, D >= 45,
    /// E >= 40, else F.
    pub fn from_score(score: f64) -> Grade {
        if score >= 70.0 {
            Grade::A
        } else if score >= 60.0 {
            Grade::B
        } else if score >= 50.0 {
            Grade::C
        } else if score >= 45.0 {
            Grade::D
        } else if score >= 40.0 {
            Grade::E
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }

    pub fn is_pass(self) -> bool {
        !matches!(self, Grade::F)
    }
}

impl core::fmt::Display for Grade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores are percentages in `[0, 100]`.
pub fn validate_score(score: f64) -> Result<(), DomainError> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(DomainError::validation(format!(
            "score must be between 0 and 100, got {score}"
        )));
    }
    Ok(())
}
