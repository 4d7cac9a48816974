//! Email delivery.
//!
//! Delivery is simulated: the handler writes the email to the log. A real
//! transport plugs in by implementing [`DeliveryHandler`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use domain::NotificationRequest;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Failure while delivering one notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient or content was refused
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// The mail transport could not be reached
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Delivers a decoded notification to its recipient.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn deliver(&self, notification: &NotificationRequest) -> Result<(), DeliveryError>;
}

/// Logs each email instead of sending it.
pub struct LoggingDeliveryHandler {
    from: String,
}

impl LoggingDeliveryHandler {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl DeliveryHandler for LoggingDeliveryHandler {
    async fn deliver(&self, notification: &NotificationRequest) -> Result<(), DeliveryError> {
        info!(
            "=== EMAIL ===\n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Body:\n{}\n\
             =============",
            self.from,
            notification.to,
            notification.subject,
            notification.body
        );

        info!(to = %notification.to, "Email sent");
        Ok(())
    }
}
