//! Welcome-queue consumer.
//!
//! A consumer is either idle, waiting for the next delivery, or processing
//! exactly one message. Every message is acknowledged once handled, whatever
//! the outcome, so a bad payload or a failed delivery never blocks the queue
//! and is never redelivered.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use domain::NotificationRequest;
use messaging::{IncomingMessage, Subscription};

use crate::delivery::DeliveryHandler;
use crate::telemetry::CONSUMER_MESSAGES;

/// Observable consumer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Processing,
}

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Decoded and handed to the delivery handler successfully
    Delivered,
    /// Payload was not a valid notification
    Malformed,
    /// Delivery handler returned an error
    DeliveryFailed,
}

impl ProcessingOutcome {
    /// Metric label value
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Delivered => "delivered",
            ProcessingOutcome::Malformed => "malformed",
            ProcessingOutcome::DeliveryFailed => "failed",
        }
    }
}

/// Message counts for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub received: u64,
    pub delivered: u64,
    pub malformed: u64,
    pub failed: u64,
}

impl ConsumerReport {
    fn record(&mut self, outcome: ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Delivered => self.delivered += 1,
            ProcessingOutcome::Malformed => self.malformed += 1,
            ProcessingOutcome::DeliveryFailed => self.failed += 1,
        }
    }
}

/// Decodes welcome notifications and passes them to a [`DeliveryHandler`].
pub struct NotificationConsumer {
    handler: Arc<dyn DeliveryHandler>,
    state: watch::Sender<ConsumerState>,
}

impl NotificationConsumer {
    pub fn new(handler: Arc<dyn DeliveryHandler>) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self { handler, state }
    }

    /// Current state.
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Process one message. Failures are logged and reported through the
    /// returned outcome; this never errors.
    pub async fn handle(&self, message: &IncomingMessage) -> ProcessingOutcome {
        self.state.send_replace(ConsumerState::Processing);
        let outcome = self.process(message).await;
        self.state.send_replace(ConsumerState::Idle);

        metrics::counter!(CONSUMER_MESSAGES, "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn process(&self, message: &IncomingMessage) -> ProcessingOutcome {
        let notification: NotificationRequest = match serde_json::from_slice(&message.payload) {
            Ok(notification) => notification,
            Err(e) => {
                error!(
                    delivery_tag = message.delivery_tag,
                    error = %e,
                    "Discarding malformed notification"
                );
                return ProcessingOutcome::Malformed;
            }
        };

        debug!(to = %notification.to, "Delivering notification");

        match self.handler.deliver(&notification).await {
            Ok(()) => ProcessingOutcome::Delivered,
            Err(e) => {
                error!(
                    delivery_tag = message.delivery_tag,
                    to = %notification.to,
                    error = %e,
                    "Failed to deliver notification"
                );
                ProcessingOutcome::DeliveryFailed
            }
        }
    }

    /// Consume `subscription` until it ends.
    ///
    /// Receive errors are logged and skipped. Each message is acked after
    /// handling, never requeued.
    pub async fn run(&self, mut subscription: Subscription) -> ConsumerReport {
        info!(queue = %subscription.queue(), "Consumer started");
        let mut report = ConsumerReport::default();

        while let Some(next) = subscription.next().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    error!(queue = %subscription.queue(), error = %e, "Error receiving message");
                    continue;
                }
            };

            report.received += 1;
            if message.redelivered {
                warn!(delivery_tag = message.delivery_tag, "Processing redelivered message");
            }

            let outcome = self.handle(&message).await;
            report.record(outcome);

            let delivery_tag = message.delivery_tag;
            if let Err(e) = message.ack().await {
                error!(delivery_tag, error = %e, "Failed to acknowledge message");
            }
        }

        info!(
            queue = %subscription.queue(),
            received = report.received,
            delivered = report.delivered,
            malformed = report.malformed,
            failed = report.failed,
            "Consumer stopped"
        );
        report
    }
}
