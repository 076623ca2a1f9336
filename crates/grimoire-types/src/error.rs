//! Error types for the knowledge-base capability surface.

use thiserror::Error;

/// Result type alias for capability operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors raised by a knowledge-base implementation.
///
/// The execution engine does not interpret these beyond "the call failed";
/// the message is surfaced verbatim to the script that made the call.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The service rejected the request.
    #[error("{message}")]
    Api {
        message: String,
        /// Machine-readable status from the service, when it sent one.
        status: Option<String>,
        /// Human-readable remediation hint from the service, when it sent one.
        remediation: Option<String>,
    },

    /// The service could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request or response could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// Create an API error with just a message.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status: None,
            remediation: None,
        }
    }

    /// Create an API error with a machine-readable status.
    pub fn api_with_status(message: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status: Some(status.into()),
            remediation: None,
        }
    }

    /// The machine-readable status, if the service sent one.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Api { status, .. } => status.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_is_verbatim() {
        let err = DomainError::api("node not found");
        assert_eq!(err.to_string(), "node not found");
        assert!(err.status().is_none());
    }

    #[test]
    fn test_api_error_with_status() {
        let err = DomainError::api_with_status("rate limited", "RATE_LIMITED");
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(err.status(), Some("RATE_LIMITED"));
    }
}
