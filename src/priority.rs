//! Event priority levels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Importance of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// `high`
    High,
    /// `medium`
    Medium,
    /// `low`
    Low,
}

/// Priority text other than `high`, `medium` or `low`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid priority {0:?}, expected high, medium or low")]
pub struct InvalidPriority(pub String);

impl Priority {
    /// Accepts only the exact lowercase literals.
    pub fn validate(value: &str) -> Result<Self, InvalidPriority> {
        match value {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(InvalidPriority(other.to_string())),
        }
    }

    /// Literal form used in input and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
