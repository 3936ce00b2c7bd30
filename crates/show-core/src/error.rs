//! Error types for the drone show engine

use thiserror::Error;

/// Core error type for the drone show engine
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No drone ids supplied for formation generation")]
    EmptyDroneIds,

    #[error("Unknown pattern type: {0}")]
    UnknownPattern(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("A show timeline needs at least one formation")]
    EmptyTimeline,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_pattern(name: impl Into<String>) -> Self {
        Self::UnknownPattern(name.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
