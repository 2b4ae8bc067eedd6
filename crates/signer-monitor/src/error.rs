//! Error types for the signer monitor

use std::time::Duration;
use thiserror::Error;

/// Signer monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Node unreachable or HTTP transport failure
    #[error("Chain client connection failed: {reason}")]
    Connection { reason: String },

    /// Node answered with a JSON-RPC error object
    #[error("JSON-RPC error from {method}: {message}")]
    Rpc { method: String, message: String },

    /// Node answered but the payload could not be interpreted
    #[error("Malformed {what} in chain response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },

    /// Chain call exceeded its per-tick budget
    #[error("Chain call {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Metrics sink rejected an update
    #[error("Metrics push failed: {reason}")]
    MetricsPush { reason: String },

    /// Signer address string is not a 20-byte hex address
    #[error("Invalid signer address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Connection {
            reason: err.to_string(),
        }
    }
}

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
