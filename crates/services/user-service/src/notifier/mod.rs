//! Notification publisher - hands welcome messages to the broker.

mod broker_notifier;

pub use broker_notifier::{BrokerNotifier, NotificationPublisher, PublishError};

#[cfg(any(test, feature = "test-utils"))]
pub use broker_notifier::MockNotificationPublisher;
