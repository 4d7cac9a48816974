//! Error types for broker operations.

use thiserror::Error;

/// Error that can occur while talking to the message broker.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// AMQP protocol or connection error
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// Broker is not reachable
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// Queue has not been declared
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// Acknowledgement could not be delivered
    #[error("Ack error: {0}")]
    Ack(String),
}

impl MessagingError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        MessagingError::Unavailable(msg.into())
    }
}

/// Result type alias for broker operations
pub type MessagingResult<T> = Result<T, MessagingError>;
