//! Error types for the tokio-event-bus library.

use crate::subscription::Rejection;
use thiserror::Error;

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tokio-event-bus
#[derive(Error, Debug)]
pub enum Error {
    /// A handler failed validation at subscription time
    #[error("Handler rejected: {0}")]
    Rejected(#[from] Rejection),

    /// A handler reported a failure while processing an event
    #[error("Handler error: {0}")]
    HandlerError(String),

    /// A payload reached a callable that declared a different event type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Declared event type of the callable
        expected: &'static str,
        /// Runtime type of the payload
        actual: &'static str,
    },

    /// The bus no longer accepts queued work
    #[error("Event bus is shutting down")]
    ShuttingDown,

    /// Shutdown was requested on a bus that is already shut down
    #[error("Event bus already shut down")]
    AlreadyShutDown,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Create a new handler error
    pub fn handler(msg: impl Into<String>) -> Self {
        Error::HandlerError(msg.into())
    }

    /// Check if this error indicates the system is shutting down
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Error::ShuttingDown | Error::AlreadyShutDown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::handler("boom");
        assert_eq!(err.to_string(), "Handler error: boom");

        let err = Error::from(Rejection::WrongArity(4));
        assert_eq!(
            err.to_string(),
            "Handler rejected: handler takes 4 parameters, expected 2 or 3"
        );
    }

    #[test]
    fn test_error_is_shutdown() {
        assert!(Error::ShuttingDown.is_shutdown());
        assert!(Error::AlreadyShutDown.is_shutdown());
        assert!(!Error::internal("test").is_shutdown());
    }
}
