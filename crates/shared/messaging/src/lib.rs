//! Message channel abstraction for the user/email hand-off.
//!
//! The user service publishes JSON payloads to a direct exchange with a
//! routing key; the email service subscribes to the durable queue bound to
//! that exchange. Both sides talk to the [`MessageChannel`] trait so the
//! broker can be RabbitMQ ([`AmqpChannel`]) or the in-process
//! [`InMemoryBroker`] used by tests and the combined development binary.
//!
//! ```text
//! ┌──────────────┐  publish(exchange, key)  ┌──────────────┐  subscribe(queue)  ┌───────────────┐
//! │ user-service │ ───────────────────────▶ │    broker    │ ─────────────────▶ │ email-service │
//! └──────────────┘                          └──────────────┘                    └───────────────┘
//! ```

pub mod amqp;
pub mod channel;
pub mod config;
pub mod error;
pub mod memory;

pub use amqp::AmqpChannel;
pub use channel::{Acknowledge, IncomingMessage, MessageChannel, Subscription};
pub use config::BrokerConfig;
pub use error::{MessagingError, MessagingResult};
pub use memory::InMemoryBroker;
