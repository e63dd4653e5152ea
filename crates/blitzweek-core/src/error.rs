//! Core error types for blitzweek-core.
//!
//! Every fallible operation in the library reports one of the enums below;
//! `CoreError` is the umbrella the CLI and callers usually work with.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for blitzweek-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backend API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The identifier is already registered
    #[error("Already registered with identifier '{identifier}'")]
    AlreadyRegistered { identifier: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Config directory could not be resolved or created
    #[error("Config directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// One or more form fields failed validation
    #[error("{}", format_field_errors(.0))]
    Fields(Vec<FieldError>),
}

/// A single failed form field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors talking to the event backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Base URL could not be parsed or joined
    #[error("Invalid API URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Transport failure (connect, timeout, TLS, body read)
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("Backend rejected {endpoint} (HTTP {status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Response had no usable `Date` header
    #[error("Response from {endpoint} carried no usable Date header")]
    MissingDate { endpoint: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response from {endpoint}: {message}")]
    UnexpectedBody { endpoint: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_as_one_line() {
        let err = ValidationError::Fields(vec![
            FieldError {
                field: "name",
                message: "Enter your full name".into(),
            },
            FieldError {
                field: "year",
                message: "Select your year".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "name: Enter your full name; year: Select your year"
        );
    }

    #[test]
    fn validation_error_converts_into_core_error() {
        let err: CoreError = ValidationError::InvalidValue {
            field: "duration_hours".into(),
            message: "must be positive".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
