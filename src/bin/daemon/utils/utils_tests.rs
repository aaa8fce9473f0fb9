// Test suite for the utils module: error conversions, formatting and the
// tracing setup.

use crate::utils::error::{ControllerFailure, MonitoggleError, Result};

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::io;

    /// Test conversion from std::io::Error to MonitoggleError
    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "socket busy");
        let error: MonitoggleError = io_error.into();
        assert!(matches!(error, MonitoggleError::IoError(_)));
        assert_eq!(format!("{}", error), "I/O error: socket busy");
    }

    /// Test conversion from TOML deserialization error
    #[test]
    fn test_toml_de_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("invalid [").unwrap_err();
        let error: MonitoggleError = toml_error.into();
        assert!(matches!(error, MonitoggleError::ConfigError(_)));
    }

    /// Test conversion from serde_json errors
    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: MonitoggleError = json_error.into();
        assert!(matches!(error, MonitoggleError::SerializationError(_)));
    }

    /// Test error message formatting
    #[test]
    fn test_error_formatting() {
        let error_cases = vec![
            (MonitoggleError::NotFound("output HDMI-1".to_string()), "Resource not found: output HDMI-1"),
            (MonitoggleError::InvalidState("last output".to_string()), "Invalid state: last output"),
            (
                MonitoggleError::InvariantViolation("priority".to_string()),
                "Invariant violation: priority",
            ),
            (
                MonitoggleError::SerializationError("key must be a string".to_string()),
                "Serialization error: key must be a string",
            ),
            (MonitoggleError::ConfigError("unknown field".to_string()), "Configuration error: unknown field"),
            (MonitoggleError::backend("Sway", "Failed"), "Backend error Sway: Failed"),
        ];

        for (error, expected) in error_cases {
            assert_eq!(format!("{}", error), expected);
        }
    }

    /// Test that errors carry their controller detail across threads
    #[test]
    fn test_error_is_send() {
        let error = MonitoggleError::BackendFailure {
            backend: "X11".to_string(),
            message: "1 controller(s) could not be configured".to_string(),
            failures: vec![ControllerFailure {
                controller: 7,
                message: "Failed".to_string(),
            }],
        };

        let handle = std::thread::spawn(move || format!("{}", error));
        assert_eq!(
            handle.join().unwrap(),
            "Backend error X11: 1 controller(s) could not be configured (controller 7: Failed)"
        );
    }

    /// Test error propagation through `?`
    #[test]
    fn test_error_propagation() {
        fn read_config() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/monitoggle.toml")?;
            Ok(content)
        }

        assert!(matches!(read_config(), Err(MonitoggleError::IoError(_))));
    }
}

#[cfg(test)]
mod tracing_tests {
    use crate::utils::tracing::setup_tracing;

    /// Setting up twice, or with an unwritable log file, must not panic
    #[test]
    fn test_setup_tracing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        setup_tracing(&dir.path().join("monitoggle.log"));
        setup_tracing(std::path::Path::new("/nonexistent/dir/monitoggle.log"));
        tracing::info!("tracing initialized");
    }
}
