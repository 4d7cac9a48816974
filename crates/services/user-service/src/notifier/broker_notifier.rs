//! Broker-backed notification publisher.
//!
//! Publishing is fire-and-forget: the message is handed to the broker
//! client and nothing waits for delivery. There is no retry and no outbox,
//! so a crash between the database commit and this call loses the message.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use domain::NotificationRequest;
use messaging::{BrokerConfig, MessageChannel, MessagingError};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Failure while sending a notification to the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel error: {0}")]
    Channel(#[from] MessagingError),
}

/// Publisher trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Send one notification to the configured exchange and routing key
    async fn publish(&self, notification: &NotificationRequest) -> Result<(), PublishError>;
}

/// Publishes JSON-encoded notifications to a direct exchange.
pub struct BrokerNotifier {
    channel: Arc<dyn MessageChannel>,
    exchange: String,
    routing_key: String,
}

impl BrokerNotifier {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }

    /// Publisher targeting the exchange and routing key from `config`.
    pub fn from_config(channel: Arc<dyn MessageChannel>, config: &BrokerConfig) -> Self {
        Self::new(channel, &config.exchange, &config.routing_key)
    }
}

#[async_trait]
impl NotificationPublisher for BrokerNotifier {
    async fn publish(&self, notification: &NotificationRequest) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(notification)?;

        self.channel
            .publish(&self.exchange, &self.routing_key, payload)
            .await?;

        debug!(
            exchange = %self.exchange,
            routing_key = %self.routing_key,
            to = %notification.to,
            "Notification handed to broker"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::InMemoryBroker;

    #[tokio::test]
    async fn publishes_json_to_the_bound_queue() {
        let config = BrokerConfig::default();
        let broker = InMemoryBroker::with_topology(&config);
        let mut subscription = broker.subscribe(&config.queue, "test").await.unwrap();

        let notifier = BrokerNotifier::from_config(Arc::new(broker.clone()), &config);
        let request = NotificationRequest::new("ana@example.com", "Oi", "Corpo");
        notifier.publish(&request).await.unwrap();

        let message = subscription.next().await.unwrap().unwrap();
        let decoded: NotificationRequest = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn broker_outage_surfaces_as_channel_error() {
        let config = BrokerConfig::default();
        let broker = InMemoryBroker::with_topology(&config);
        broker.set_unavailable(true);

        let notifier = BrokerNotifier::from_config(Arc::new(broker), &config);
        let result = notifier
            .publish(&NotificationRequest::new("a@b.c", "s", "b"))
            .await;

        assert!(matches!(result, Err(PublishError::Channel(_))));
    }
}
