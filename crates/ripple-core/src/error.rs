// Error types for ingestion, fan-out and the live stream
//
// Decision: One taxonomy for the whole core. The API layer maps each variant
// to an HTTP status; Delivery never reaches a producer.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Errors that can occur in the distribution and analytics core
#[derive(Debug, Error)]
pub enum RippleError {
    /// Bad or missing input (client-caused)
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid caller identity
    #[error("{0}")]
    Auth(String),

    /// Referenced entity absent
    #[error("{0} not found")]
    NotFound(String),

    /// Durable store failure; the caller must retry
    #[error("Storage error: {0}")]
    Storage(String),

    /// A single live connection failed to receive a push
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RippleError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        RippleError::Validation(msg.into())
    }

    /// Create an auth error
    pub fn auth(msg: impl Into<String>) -> Self {
        RippleError::Auth(msg.into())
    }

    /// Create a not found error for the named entity
    pub fn not_found(entity: impl Into<String>) -> Self {
        RippleError::NotFound(entity.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        RippleError::Storage(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        RippleError::Delivery(msg.into())
    }

    /// Whether the error was caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RippleError::Validation(_) | RippleError::Auth(_) | RippleError::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RippleError::validation("verb is required").to_string(),
            "verb is required"
        );
        assert_eq!(
            RippleError::not_found("Notification").to_string(),
            "Notification not found"
        );
        assert_eq!(
            RippleError::storage("connection reset").to_string(),
            "Storage error: connection reset"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RippleError::validation("x").is_client_error());
        assert!(RippleError::auth("x").is_client_error());
        assert!(RippleError::not_found("x").is_client_error());
        assert!(!RippleError::storage("x").is_client_error());
        assert!(!RippleError::delivery("x").is_client_error());
    }
}
