//! Result and error types for authprobe.

use thiserror::Error;

/// Result type for authprobe operations
pub type AuthProbeResult<T> = Result<T, AuthProbeError>;

/// Errors that can occur while driving the login application
#[derive(Debug, Error)]
pub enum AuthProbeError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Browser shutdown error
    #[error("Failed to close browser: {message}")]
    BrowserClose {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A wait bound elapsed before the condition held
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// In-page script evaluation error
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Click or typing failed
    #[error("Input failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Neither the register nor the authenticate control was present
    #[error("No {factor} action button present")]
    MissingControl {
        /// Factor name ("biometric" or "face")
        factor: String,
    },

    /// Scenario assertion failed
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Error message
        message: String,
    },

    /// Fixture provisioning or cleanup failed
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl AuthProbeError {
    /// Create a timeout error
    #[must_use]
    pub fn timeout(ms: u64, waited_for: impl Into<String>) -> Self {
        Self::Timeout {
            ms,
            waited_for: waited_for.into(),
        }
    }

    /// Create a browser shutdown error
    #[must_use]
    pub fn browser_close(message: impl Into<String>) -> Self {
        Self::BrowserClose {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create an input error
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether a scenario must stop rather than log and continue
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingControl { .. } | Self::Assertion { .. } | Self::BrowserLaunch { .. }
        )
    }
}

/// Fail with an assertion error unless `condition` holds.
///
/// # Errors
///
/// Returns [`AuthProbeError::Assertion`] carrying `message`.
pub fn ensure(condition: bool, message: impl Into<String>) -> AuthProbeResult<()> {
    if condition {
        Ok(())
    } else {
        Err(AuthProbeError::assertion(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = AuthProbeError::timeout(15_000, "password tab visible");
        assert_eq!(
            err.to_string(),
            "Timed out after 15000ms waiting for password tab visible"
        );
        assert!(err.is_timeout());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_control_is_fatal() {
        let err = AuthProbeError::MissingControl {
            factor: "face".to_string(),
        };
        assert_eq!(err.to_string(), "No face action button present");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_close_failure_is_not_fatal() {
        let err = AuthProbeError::browser_close("connection reset");
        assert_eq!(err.to_string(), "Failed to close browser: connection reset");
        assert!(!err.is_fatal());
        assert!(AuthProbeError::BrowserLaunch {
            message: "no chromium".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "never").is_ok());
        let err = ensure(false, "lockout banner missing").unwrap_err();
        assert!(matches!(err, AuthProbeError::Assertion { .. }));
        assert!(err.to_string().contains("lockout banner missing"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "authprobe.yaml");
        let err: AuthProbeError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
