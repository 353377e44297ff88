//! Error types for glucoview

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoViewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ValueError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Why a glucose value was rejected.
///
/// The variant is the error category; presentation picks its own wording
/// from it, the message is only a plain fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("glucose value must be a number")]
    NotANumber,

    #[error("glucose value too low (minimum: {min} mg/dL)")]
    TooLow { min: u16 },

    #[error("glucose value too high (maximum: {max} mg/dL)")]
    TooHigh { max: u16 },
}

/// A user-facing validation failure: the offending field and a message that
/// never exposes parser internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}
