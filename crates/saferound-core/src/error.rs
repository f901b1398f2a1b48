//! Core error types for saferound-core.
//!
//! Each concern gets its own `thiserror` enum; [`CoreError`] wraps them all
//! for callers that only need to report a failure. Total operations (tag
//! decoding, drink validation, assessment submission) never surface these
//! errors -- they fold them into their terminal outcome instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for saferound-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Tag or sensor hardware errors
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Sobriety pipeline misuse
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Config directory could not be resolved or created
    #[error("Config directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Errors from the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The configured base URL (or a joined endpoint) is not a valid URL
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network unreachable, connection reset, timeout
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Server returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Body could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Tag session and motion sensor failures.
#[derive(Error, Debug)]
pub enum HardwareError {
    /// The tag session could not be established
    #[error("Tag session unavailable: {0}")]
    SessionUnavailable(String),

    /// Read or write against an open tag failed
    #[error("Tag I/O failed: {0}")]
    TagIo(String),

    /// The motion sensor refused a subscription
    #[error("Motion sensor unavailable: {0}")]
    SensorUnavailable(String),
}

/// Sobriety pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Operation not valid in the current stage
    #[error("Cannot {action} while pipeline is {stage}")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },

    /// Typing submission attempted before the reference length was reached
    #[error("Typing incomplete: {entered} of {required} characters entered")]
    TypingIncomplete { entered: usize, required: usize },

    /// Sensor subscription could not be established
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Join code was not exactly six digits
    #[error("Enter a 6-digit code (got {digits} digits)")]
    InvalidJoinCode { digits: usize },

    /// Too many entries in a bounded collection
    #[error("Too many {collection}: {len} (max {max})")]
    TooMany {
        collection: String,
        len: usize,
        max: usize,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
