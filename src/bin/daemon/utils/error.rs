//! Unified Error Handling System
//!
//! This module defines the error type shared by the layout engine, the display
//! backends and the daemon server.

use thiserror::Error;

/// Failure reported by a backend for one controller while applying a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerFailure {
    pub controller: u32,
    pub message: String,
}

impl std::fmt::Display for ControllerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "controller {}: {}", self.controller, self.message)
    }
}

/// Enumeration of all error types in the application
#[derive(Error, Debug)]
pub enum MonitoggleError {
    /// Referenced output or controller is absent from the snapshot
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The requested change is not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The snapshot contradicts itself; the operation is abandoned
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Error reported by a display backend (X11, sway, ...)
    #[error("Backend error {backend}: {message}{}", format_failures(.failures))]
    BackendFailure {
        backend: String,
        message: String,
        failures: Vec<ControllerFailure>,
    },

    /// System I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file could not be understood
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A reply could not be encoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn format_failures(failures: &[ControllerFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let details = failures
        .iter()
        .map(ControllerFailure::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ({})", details)
}

impl MonitoggleError {
    /// Shorthand for a backend error without per-controller detail
    pub fn backend(backend: &str, message: impl Into<String>) -> Self {
        MonitoggleError::BackendFailure {
            backend: backend.to_string(),
            message: message.into(),
            failures: Vec::new(),
        }
    }
}

impl From<toml::de::Error> for MonitoggleError {
    fn from(error: toml::de::Error) -> Self {
        MonitoggleError::ConfigError(error.to_string())
    }
}

impl From<serde_json::Error> for MonitoggleError {
    fn from(error: serde_json::Error) -> Self {
        MonitoggleError::SerializationError(error.to_string())
    }
}

/// Standardized result type for the entire application
pub type Result<T> = std::result::Result<T, MonitoggleError>;
