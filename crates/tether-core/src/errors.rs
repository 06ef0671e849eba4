//! Unified error type for Tether
//!
//! Remote failures are normally captured as step outcomes rather than raised;
//! this type covers the cases that do propagate: invalid input, configuration,
//! local storage and the classified remote outcomes when a caller asks for them.

use serde::{Deserialize, Serialize};

/// Unified error type for all Tether operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TetherError {
    /// Invalid input (identifiers, coordinates, credential requests)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// The remote service reported that the resource does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout)
    #[error("Transport failure: {message}")]
    TransportFailure {
        /// Error message describing the network issue
        message: String,
    },

    /// The remote service answered with a non-success status
    #[error("Remote rejected request ({status}): {body}")]
    RemoteRejection {
        /// HTTP status code
        status: u16,
        /// Compact rendering of the response body
        body: String,
    },

    /// Registration of the base record failed; nothing else can run
    #[error("Fatal setup failure: {message}")]
    FatalSetupFailure {
        /// Error message describing why setup failed
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Local file operation failed (key files, run logs)
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },
}

impl TetherError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a transport failure error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    /// Create a remote rejection error
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteRejection {
            status,
            body: body.into(),
        }
    }

    /// Create a fatal setup error
    pub fn fatal_setup(message: impl Into<String>) -> Self {
        Self::FatalSetupFailure {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Standard Result type for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;

impl From<std::io::Error> for TetherError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TetherError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TetherError::rejected(403, "{\"code\":7}");
        assert_eq!(err.to_string(), "Remote rejected request (403): {\"code\":7}");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(
            TetherError::from(io_err),
            TetherError::Storage { .. }
        ));
    }
}
