//! Consumer integration tests over the in-memory broker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use domain::NotificationRequest;
use email_service_lib::config::EmailServiceConfig;
use email_service_lib::delivery::{DeliveryError, DeliveryHandler};
use email_service_lib::spawn_consumers;
use messaging::{
    IncomingMessage, InMemoryBroker, MessageChannel, MessagingError, MessagingResult, Subscription,
};

/// Records every delivered recipient.
#[derive(Default)]
struct RecordingHandler {
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl DeliveryHandler for RecordingHandler {
    async fn deliver(&self, notification: &NotificationRequest) -> Result<(), DeliveryError> {
        self.delivered.lock().unwrap().push(notification.to.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_competing_consumers_deliver_each_message_once() {
    let config = EmailServiceConfig {
        consumer_instances: 3,
        ..EmailServiceConfig::default()
    };
    let broker = InMemoryBroker::with_topology(&config.broker);
    let handler = Arc::new(RecordingHandler::default());

    let handles = spawn_consumers(&config, Arc::new(broker.clone()), handler.clone())
        .await
        .unwrap();
    assert_eq!(handles.len(), 3);

    for i in 0..10 {
        let payload =
            serde_json::to_vec(&NotificationRequest::new(format!("user{}@example.com", i), "Oi", "Corpo"))
                .unwrap();
        broker
            .publish(&config.broker.exchange, &config.broker.routing_key, payload)
            .await
            .unwrap();
    }
    broker.close();

    let mut received = 0;
    for handle in handles {
        received += handle.await.unwrap().received;
    }
    assert_eq!(received, 10);

    let mut delivered = handler.delivered.lock().unwrap().clone();
    delivered.sort();
    delivered.dedup();
    assert_eq!(delivered.len(), 10);
}

#[tokio::test]
async fn test_subscribing_to_undeclared_queue_fails() {
    let config = EmailServiceConfig::default();
    let broker = InMemoryBroker::new();

    let result = spawn_consumers(
        &config,
        Arc::new(broker),
        Arc::new(RecordingHandler::default()),
    )
    .await;

    assert!(result.is_err());
}

/// Sets its flag when the owning subscription is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Channel whose first subscription idles forever and whose later
/// subscriptions fail.
#[derive(Default)]
struct FailingAfterFirstChannel {
    subscriptions: AtomicUsize,
    first_dropped: Arc<AtomicBool>,
}

#[async_trait]
impl MessageChannel for FailingAfterFirstChannel {
    async fn publish(&self, _exchange: &str, _routing_key: &str, _payload: Vec<u8>) -> MessagingResult<()> {
        Ok(())
    }

    async fn subscribe(&self, queue: &str, _consumer_tag: &str) -> MessagingResult<Subscription> {
        if self.subscriptions.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(MessagingError::unavailable("channel closed"));
        }

        let guard = DropFlag(self.first_dropped.clone());
        let stream = futures::stream::unfold(guard, |guard| async move {
            futures::future::pending::<()>().await;
            Some((Err::<IncomingMessage, _>(MessagingError::unavailable("idle")), guard))
        });
        Ok(Subscription::new(queue, stream.boxed()))
    }
}

#[tokio::test]
async fn test_failed_subscription_stops_already_started_consumers() {
    let config = EmailServiceConfig {
        consumer_instances: 2,
        ..EmailServiceConfig::default()
    };
    let channel = Arc::new(FailingAfterFirstChannel::default());

    let result = spawn_consumers(
        &config,
        channel.clone(),
        Arc::new(RecordingHandler::default()),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(channel.subscriptions.load(Ordering::SeqCst), 2);

    let stopped = tokio::time::timeout(Duration::from_secs(1), async {
        while !channel.first_dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(stopped.is_ok(), "first consumer task kept running");
}
