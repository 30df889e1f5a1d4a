//! Error handling module for sysprep
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Detection and configuration errors surface from `main` before any action
//! runs; the remaining kinds are recorded against a single action by the
//! executor.

use std::time::Duration;
use thiserror::Error;

/// Main error type for sysprep
#[derive(Error, Debug)]
pub enum SetupError {
    /// Host OS could not be identified at all
    #[error("Platform detection failed: {0}")]
    Detection(String),

    /// Action has no translation for the detected package-manager family
    #[error("Unsupported platform: no '{kind}' translation for family '{family}'")]
    UnsupportedPlatform { kind: String, family: String },

    /// External command ran but exited non-zero
    #[error("Command failed (exit code {code}): {command}")]
    CommandExecution {
        command: String,
        code: i32,
        output: String,
    },

    /// External command could not be started
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// External command exceeded the per-action timeout
    #[error("Command timed out after {limit:?}: {command}")]
    Timeout { command: String, limit: Duration },

    /// Setup file errors (loading, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Action is malformed (e.g. install with no packages)
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sysprep operations
pub type Result<T> = std::result::Result<T, SetupError>;

// Convenient error constructors
impl SetupError {
    /// Create a detection error
    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    /// Create an unsupported-platform error
    pub fn unsupported(kind: impl ToString, family: impl ToString) -> Self {
        Self::UnsupportedPlatform {
            kind: kind.to_string(),
            family: family.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-action error
    pub fn invalid_action(msg: impl Into<String>) -> Self {
        Self::InvalidAction(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::unsupported("install", "other");
        assert_eq!(
            err.to_string(),
            "Unsupported platform: no 'install' translation for family 'other'"
        );

        let err = SetupError::config("phase name is empty");
        assert_eq!(err.to_string(), "Configuration error: phase name is empty");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SetupError = io_err.into();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn test_timeout_display_keeps_subsecond_limit() {
        let err = SetupError::Timeout {
            command: "sleep 5".into(),
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Command timed out after 250ms: sleep 5");
    }
}
