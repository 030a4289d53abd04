//! Error types shared by every layer that validates input or drives missions.

use thiserror::Error;

use crate::models::MissionStatus;

/// Malformed or out-of-range input. Never accompanied by a state change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("progress {0} is outside 0..=100")]
    OutOfRange(f64),
}

impl ValidationError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Field the error refers to, if any.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Invalid { field, .. } => field,
            Self::OutOfRange(_) => "progress",
        }
    }
}

/// A mission operation that is not legal from the mission's current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} a mission that is {from}")]
pub struct InvalidTransition {
    pub from: MissionStatus,
    pub action: String,
}

impl InvalidTransition {
    pub fn new(from: MissionStatus, action: impl Into<String>) -> Self {
        Self {
            from,
            action: action.into(),
        }
    }
}
