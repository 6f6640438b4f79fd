//! Error types for the stride_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stride_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range numeric input (height, weight, calories, time fields)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Time string is not a two-field HH:MM value with hour 0-23 and minute 0-59
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// A reminder resolved to a non-positive delay
    #[error("Invalid schedule: reminder would fire in {0} seconds")]
    InvalidSchedule(i64),

    /// The notification collaborator refused or failed to schedule a reminder
    #[error("Scheduling failure: {0}")]
    SchedulingFailure(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store error
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// True for errors raised by input validation, before any state is touched
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::InvalidTimeFormat(_))
    }
}
