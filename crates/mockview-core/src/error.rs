//! Core error types for mockview-core.
//!
//! This module defines the error hierarchy using thiserror. Popup and refresh
//! failures are mostly reported through notices and logs rather than these
//! types; see the `popup` and `tokens` modules.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mockview-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Hosted database errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Popup host errors
    #[error("Popup error: {0}")]
    Popup(#[from] PopupError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// OS keyring access failed
    #[error("Credential store error for '{key}': {message}")]
    Credential { key: String, message: String },
}

/// Errors from the hosted database REST service.
#[derive(Error, Debug)]
pub enum BackendError {
    /// 401: missing or expired access token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403, or an admin operation attempted by a non-admin
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404, or a single-row query that matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Base URL could not be joined with a table path
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised by a popup host when opening a window.
#[derive(Error, Debug)]
pub enum PopupError {
    /// The environment refused to open the window
    #[error("Popup blocked: {0}")]
    Blocked(String),

    /// The window opened but could not be controlled
    #[error("Popup window error: {0}")]
    Window(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl BackendError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            401 => BackendError::Unauthorized(message),
            403 => BackendError::Forbidden(message),
            404 => BackendError::NotFound(message),
            code => BackendError::Status {
                status: code,
                message,
            },
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
