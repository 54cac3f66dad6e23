//! Crate-wide error types.

use thiserror::Error;

/// Errors surfaced by the dispatch layer.
///
/// Provider-side failures are classified and retried before they ever become a
/// `DispatchError`; the variants below are what callers observe once a job or
/// subscription call is terminal, plus the programming errors that are never
/// retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The job's message variant has no outbound payload mapping.
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// No credentials are registered for the tenant.
    #[error("Unknown tenant: {0}")]
    UnknownTenant(String),

    /// The queue no longer accepts work.
    #[error("Dispatch queue is closed")]
    QueueClosed,

    /// Caller-supplied job or request is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A component was given settings it cannot run with.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A limiter request can never be satisfied.
    #[error("Rate limit error: {0}")]
    RateLimit(String),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::UnsupportedMessageType("sticker".into());
        assert_eq!(err.to_string(), "Unsupported message type: sticker");

        let err = DispatchError::Config("refill_rate must be > 0".into());
        assert_eq!(err.to_string(), "Configuration error: refill_rate must be > 0");

        assert_eq!(DispatchError::QueueClosed.to_string(), "Dispatch queue is closed");
    }
}
