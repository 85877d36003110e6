//! Error types

use std::fmt;
use thiserror::Error;

/// Error reported by the transport when a connect call or a session call fails.
///
/// Mirrors what the native client library exposes after a failure: a numeric
/// error code, a five-character SQL state and a human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Native error number
    pub code: u32,
    /// SQL state (e.g. `08S01`, `HY000`)
    pub sqlstate: String,
    /// Message text
    pub message: String,
}

impl NativeError {
    /// Create a new native error
    pub fn new(code: u32, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }

    /// Whether this failure is local to the endpoint that produced it.
    ///
    /// Network-class failures let failover move on to the next endpoint;
    /// anything else aborts the whole attempt.
    pub fn is_network(&self) -> bool {
        use crate::protocol::constants::{codes, NETWORK_SQLSTATE_CLASS};

        matches!(
            self.code,
            codes::ER_CON_COUNT_ERROR
                | codes::CR_SOCKET_CREATE_ERROR
                | codes::CR_CONNECTION_ERROR
                | codes::CR_CONN_HOST_ERROR
                | codes::CR_IPSOCK_ERROR
                | codes::CR_UNKNOWN_HOST
        ) || self.sqlstate.starts_with(NETWORK_SQLSTATE_CLASS)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.sqlstate, self.message)
    }
}

impl std::error::Error for NativeError {}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Option value has the wrong type for its registry entry
    #[error("wrong type passed for {option}, expected {expected}")]
    TypeMismatch {
        /// Option name
        option: String,
        /// Expected value type
        expected: &'static str,
    },

    /// Value out of range, conflicting options, or missing required option
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport refused an option the caller explicitly asked for
    #[error("unsupported option {option}: {message}")]
    UnsupportedOption {
        /// Option name as supplied by the caller
        option: String,
        /// Transport message
        message: String,
    },

    /// Endpoint-local network failure (retryable)
    #[error("network failure: {0}")]
    Network(NativeError),

    /// Non-network failure reported by the server or transport
    #[error("{}", .0.message)]
    FatalConnect(NativeError),

    /// Every candidate endpoint failed with a retryable error
    #[error("{message}")]
    ExhaustedEndpoints {
        /// Endpoint-set dependent message
        message: String,
        /// Native code of the last failure
        code: u32,
        /// SQL state of the last failure
        sqlstate: String,
        /// Number of endpoints attempted
        attempted: usize,
    },

    /// Establishment state machine violation
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// JSON option document could not be decoded
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Shorthand for [`Error::TypeMismatch`]
    pub fn type_mismatch(option: impl Into<String>, expected: &'static str) -> Self {
        Error::TypeMismatch {
            option: option.into(),
            expected,
        }
    }

    /// Native error code, if this error carries one
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Network(e) | Error::FatalConnect(e) => Some(e.code),
            Error::ExhaustedEndpoints { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// SQL state, if this error carries one
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Network(e) | Error::FatalConnect(e) => Some(&e.sqlstate),
            Error::ExhaustedEndpoints { sqlstate, .. } => Some(sqlstate),
            _ => None,
        }
    }

    /// Whether the failure is endpoint-local and another endpoint may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Whether the error was raised while validating options, before any
    /// network activity
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. } | Error::InvalidArgument(_) | Error::Json(_)
        )
    }
}

impl From<NativeError> for Error {
    fn from(e: NativeError) -> Self {
        if e.is_network() {
            Error::Network(e)
        } else {
            Error::FatalConnect(e)
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::codes;

    #[test]
    fn test_network_codes_are_retryable() {
        for code in [
            codes::ER_CON_COUNT_ERROR,
            codes::CR_SOCKET_CREATE_ERROR,
            codes::CR_CONNECTION_ERROR,
            codes::CR_CONN_HOST_ERROR,
            codes::CR_IPSOCK_ERROR,
            codes::CR_UNKNOWN_HOST,
        ] {
            let err: Error = NativeError::new(code, "HY000", "boom").into();
            assert!(err.is_retryable(), "code {} should be retryable", code);
        }
    }

    #[test]
    fn test_network_sqlstate_class_is_retryable() {
        let err: Error = NativeError::new(9999, "08S01", "link failure").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_access_denied_is_fatal() {
        let err: Error = NativeError::new(1045, "28000", "Access denied").into();
        assert!(!err.is_retryable());
        assert_eq!(err.code(), Some(1045));
        assert_eq!(err.sqlstate(), Some("28000"));
        assert_eq!(err.to_string(), "Access denied");
    }

    #[test]
    fn test_validation_errors() {
        assert!(Error::invalid("x").is_validation());
        assert!(Error::type_mismatch("port", "integer").is_validation());
        assert!(!Error::Network(NativeError::new(2003, "HY000", "x")).is_validation());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::type_mismatch("OPT_RECONNECT", "bool");
        assert_eq!(
            err.to_string(),
            "wrong type passed for OPT_RECONNECT, expected bool"
        );
    }
}
