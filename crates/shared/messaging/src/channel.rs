//! Broker-agnostic channel traits and message types.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::error::MessagingResult;

/// A broker connection that can publish to exchanges and subscribe to queues.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publish a raw payload to `exchange` with `routing_key`.
    ///
    /// Returns once the broker client accepted the message. No publisher
    /// confirm is awaited.
    async fn publish(&self, exchange: &str, routing_key: &str, payload: Vec<u8>)
        -> MessagingResult<()>;

    /// Register a consumer on `queue`.
    async fn subscribe(&self, queue: &str, consumer_tag: &str) -> MessagingResult<Subscription>;

    /// Whether the underlying connection is usable.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Acknowledges one delivery back to the broker.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(self: Box<Self>) -> MessagingResult<()>;
}

/// One message received from a queue.
pub struct IncomingMessage {
    /// Raw message body
    pub payload: Vec<u8>,
    /// Broker-assigned delivery tag
    pub delivery_tag: u64,
    /// Set when the broker redelivers after a consumer died mid-message
    pub redelivered: bool,
    acker: Option<Box<dyn Acknowledge>>,
}

impl IncomingMessage {
    /// Message that needs an explicit acknowledgement.
    pub fn new(
        payload: Vec<u8>,
        delivery_tag: u64,
        redelivered: bool,
        acker: Box<dyn Acknowledge>,
    ) -> Self {
        Self {
            payload,
            delivery_tag,
            redelivered,
            acker: Some(acker),
        }
    }

    /// Message the broker already considers consumed.
    pub fn auto_acked(payload: Vec<u8>, delivery_tag: u64) -> Self {
        Self {
            payload,
            delivery_tag,
            redelivered: false,
            acker: None,
        }
    }

    /// Acknowledge the message, consuming it.
    pub async fn ack(self) -> MessagingResult<()> {
        match self.acker {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// A live subscription on a queue.
///
/// Yields messages until the broker cancels the consumer or the connection
/// closes. Individual items may be errors; the stream keeps going after them.
pub struct Subscription {
    queue: String,
    inner: BoxStream<'static, MessagingResult<IncomingMessage>>,
}

impl Subscription {
    pub fn new(
        queue: impl Into<String>,
        inner: BoxStream<'static, MessagingResult<IncomingMessage>>,
    ) -> Self {
        Self {
            queue: queue.into(),
            inner,
        }
    }

    /// Queue this subscription consumes from.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Wait for the next delivery. `None` means the subscription ended.
    pub async fn next(&mut self) -> Option<MessagingResult<IncomingMessage>> {
        self.inner.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FlagAcker(Arc<AtomicBool>);

    #[async_trait]
    impl Acknowledge for FlagAcker {
        async fn ack(self: Box<Self>) -> MessagingResult<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn ack_reaches_the_acker() {
        let acked = Arc::new(AtomicBool::new(false));
        let message = IncomingMessage::new(b"{}".to_vec(), 7, false, Box::new(FlagAcker(acked.clone())));

        message.ack().await.unwrap();
        assert!(acked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn subscription_ends_with_its_stream() {
        let items = vec![
            Ok(IncomingMessage::auto_acked(b"a".to_vec(), 1)),
            Ok(IncomingMessage::auto_acked(b"b".to_vec(), 2)),
        ];
        let mut subscription = Subscription::new("q", futures::stream::iter(items).boxed());

        assert_eq!(subscription.queue(), "q");
        assert_eq!(subscription.next().await.unwrap().unwrap().payload, b"a");
        assert_eq!(subscription.next().await.unwrap().unwrap().payload, b"b");
        assert!(subscription.next().await.is_none());
    }
}
