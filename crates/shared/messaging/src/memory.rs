//! In-process broker with direct-exchange routing.
//!
//! Used by the combined development binary and by tests. Routing matches
//! AMQP direct exchanges: a message goes to every queue bound to
//! `(exchange, routing_key)` and is dropped when nothing is bound. Several
//! subscribers on one queue compete for messages; each message is handed to
//! exactly one of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

use crate::channel::{IncomingMessage, MessageChannel, Subscription};
use crate::config::BrokerConfig;
use crate::error::{MessagingError, MessagingResult};

type Receiver = Arc<AsyncMutex<mpsc::UnboundedReceiver<IncomingMessage>>>;

struct Queue {
    sender: mpsc::UnboundedSender<IncomingMessage>,
    receiver: Receiver,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }
}

#[derive(Default)]
struct Inner {
    bindings: Mutex<HashMap<(String, String), Vec<String>>>,
    queues: Mutex<HashMap<String, Queue>>,
    unavailable: AtomicBool,
    closed: AtomicBool,
    next_tag: AtomicU64,
}

/// Cloneable handle to an in-process broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker with the exchange, queue and binding from `config` declared.
    pub fn with_topology(config: &BrokerConfig) -> Self {
        let broker = Self::new();
        broker.bind(&config.exchange, &config.queue, &config.routing_key);
        broker
    }

    /// Declare a queue (idempotent).
    pub fn declare_queue(&self, queue: &str) {
        lock(&self.inner.queues)
            .entry(queue.to_string())
            .or_insert_with(Queue::new);
    }

    /// Declare `queue` and bind it to `exchange` under `routing_key`.
    pub fn bind(&self, exchange: &str, queue: &str, routing_key: &str) {
        self.declare_queue(queue);

        let mut bindings = lock(&self.inner.bindings);
        let queues = bindings
            .entry((exchange.to_string(), routing_key.to_string()))
            .or_default();
        if !queues.iter().any(|q| q == queue) {
            queues.push(queue.to_string());
        }
    }

    /// Simulate an outage: while set, every publish fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop every binding and queue. Subscriptions end once their buffered
    /// messages drain; later publishes fail.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        lock(&self.inner.bindings).clear();
        lock(&self.inner.queues).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MessageChannel for InMemoryBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> MessagingResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(MessagingError::unavailable("in-memory broker is down"));
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(MessagingError::unavailable("in-memory broker is closed"));
        }

        let targets = lock(&self.inner.bindings)
            .get(&(exchange.to_string(), routing_key.to_string()))
            .cloned()
            .unwrap_or_default();

        if targets.is_empty() {
            debug!(exchange = %exchange, routing_key = %routing_key, "Unroutable message dropped");
            return Ok(());
        }

        let queues = lock(&self.inner.queues);
        for name in targets {
            if let Some(queue) = queues.get(&name) {
                let tag = self.inner.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                // Send only fails once the receiver is gone, i.e. after close().
                let _ = queue
                    .sender
                    .send(IncomingMessage::auto_acked(payload.clone(), tag));
            }
        }

        Ok(())
    }

    async fn subscribe(&self, queue: &str, _consumer_tag: &str) -> MessagingResult<Subscription> {
        let receiver = lock(&self.inner.queues)
            .get(queue)
            .map(|q| q.receiver.clone())
            .ok_or_else(|| MessagingError::QueueNotFound(queue.to_string()))?;

        let stream = futures::stream::unfold(receiver, |receiver| async move {
            let message = receiver.lock().await.recv().await;
            message.map(|m| (Ok(m), receiver))
        });

        Ok(Subscription::new(queue, stream.boxed()))
    }

    fn is_connected(&self) -> bool {
        !self.inner.unavailable.load(Ordering::SeqCst) && !self.inner.closed.load(Ordering::SeqCst)
    }
}
