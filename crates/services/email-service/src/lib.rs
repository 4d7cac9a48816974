//! Email Service Library
//!
//! Consumes welcome notifications from the broker and delivers them.
//! It can be run as a standalone service or embedded in the combined binary.

pub mod config;
pub mod consumer;
pub mod delivery;
pub mod telemetry;

use std::sync::Arc;

use messaging::{AmqpChannel, MessageChannel};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::EmailServiceConfig;
use crate::consumer::{ConsumerReport, NotificationConsumer};
use crate::delivery::{DeliveryHandler, LoggingDeliveryHandler};

/// Run the email service against a RabbitMQ broker.
///
/// Declares the welcome queue before subscribing. Fails fast when the broker
/// is unreachable at startup.
pub async fn run_embedded(config: EmailServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let channel = AmqpChannel::connect(&config.broker).await?;
    channel.declare_queue(&config.broker.queue).await?;

    run_with_channel(config, Arc::new(channel)).await
}

/// Consume through an already connected channel until Ctrl+C or until every
/// subscription ends.
pub async fn run_with_channel(
    config: EmailServiceConfig,
    channel: Arc<dyn MessageChannel>,
) -> Result<(), Box<dyn std::error::Error>> {
    let handler: Arc<dyn DeliveryHandler> = Arc::new(LoggingDeliveryHandler::new(&config.from));
    let consumers = spawn_consumers(&config, channel, handler).await?;

    info!(
        queue = %config.broker.queue,
        instances = consumers.len(),
        "Email service started. Press Ctrl+C to stop."
    );

    let abort_handles: Vec<_> = consumers.iter().map(JoinHandle::abort_handle).collect();

    tokio::select! {
        _ = wait_all(consumers) => {
            info!("All subscriptions ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping consumers...");
            for handle in abort_handles {
                handle.abort();
            }
        }
    }

    info!("Email service stopped");
    Ok(())
}

/// Subscribe `config.consumer_instances` competing consumers to the welcome
/// queue, each on its own task.
pub async fn spawn_consumers(
    config: &EmailServiceConfig,
    channel: Arc<dyn MessageChannel>,
    handler: Arc<dyn DeliveryHandler>,
) -> Result<Vec<JoinHandle<ConsumerReport>>, Box<dyn std::error::Error>> {
    let instances = config.consumer_instances.max(1);
    let mut handles: Vec<JoinHandle<ConsumerReport>> = Vec::with_capacity(instances);

    for index in 0..instances {
        let tag = if instances == 1 {
            config.broker.consumer_tag.clone()
        } else {
            format!("{}-{}", config.broker.consumer_tag, index)
        };

        let subscription = match channel.subscribe(&config.broker.queue, &tag).await {
            Ok(subscription) => subscription,
            Err(e) => {
                for handle in &handles {
                    handle.abort();
                }
                return Err(e.into());
            }
        };
        let consumer = NotificationConsumer::new(handler.clone());
        handles.push(tokio::spawn(async move { consumer.run(subscription).await }));
    }

    Ok(handles)
}

async fn wait_all(handles: Vec<JoinHandle<ConsumerReport>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Consumer task failed");
        }
    }
}
