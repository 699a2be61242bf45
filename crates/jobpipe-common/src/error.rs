//! Error types shared across jobpipe crates

use thiserror::Error;

/// Result type alias for shared jobpipe operations
pub type Result<T> = std::result::Result<T, JobpipeError>;

/// Errors raised while parsing shared configuration values
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobpipeError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl JobpipeError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
