//! RabbitMQ implementation of [`MessageChannel`] on top of lapin.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    acker::Acker,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tracing::{debug, info};

use crate::channel::{Acknowledge, IncomingMessage, MessageChannel, Subscription};
use crate::config::BrokerConfig;
use crate::error::{MessagingError, MessagingResult};

/// Persistent delivery mode (survives broker restart on durable queues)
const DELIVERY_MODE_PERSISTENT: u8 = 2;

const CONTENT_TYPE_JSON: &str = "application/json";

/// AMQP connection plus one channel used for both publishing and consuming.
pub struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

impl AmqpChannel {
    /// Connect to the broker and open a channel.
    pub async fn connect(config: &BrokerConfig) -> MessagingResult<Self> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| MessagingError::unavailable(e.to_string()))?;
        let channel = connection.create_channel().await?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await?;

        info!(prefetch = config.prefetch_count, "Connected to message broker");
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Declare a durable queue (idempotent).
    pub async fn declare_queue(&self, queue: &str) -> MessagingResult<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        debug!(queue = %queue, "Queue declared");
        Ok(())
    }

    /// Declare the direct exchange, the durable queue and the binding between them.
    pub async fn declare_binding(
        &self,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> MessagingResult<()> {
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.declare_queue(queue).await?;

        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            exchange = %exchange,
            queue = %queue,
            routing_key = %routing_key,
            "Broker topology declared"
        );
        Ok(())
    }

    /// Declare everything described by `config`.
    pub async fn declare_topology(&self, config: &BrokerConfig) -> MessagingResult<()> {
        self.declare_binding(&config.exchange, &config.queue, &config.routing_key)
            .await
    }
}

#[async_trait]
impl MessageChannel for AmqpChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> MessagingResult<()> {
        let properties = BasicProperties::default()
            .with_content_type(CONTENT_TYPE_JSON.into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);

        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await?
            .await?;

        debug!(
            exchange = %exchange,
            routing_key = %routing_key,
            bytes = payload.len(),
            "Message published"
        );
        Ok(())
    }

    async fn subscribe(&self, queue: &str, consumer_tag: &str) -> MessagingResult<Subscription> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(queue = %queue, consumer_tag = %consumer_tag, "Subscribed to queue");

        let stream = consumer.map(|delivery| -> MessagingResult<IncomingMessage> {
            let delivery = delivery?;
            Ok(IncomingMessage::new(
                delivery.data,
                delivery.delivery_tag,
                delivery.redelivered,
                Box::new(AmqpAcker(delivery.acker)),
            ))
        });

        Ok(Subscription::new(queue, stream.boxed()))
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledge for AmqpAcker {
    async fn ack(self: Box<Self>) -> MessagingResult<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| MessagingError::Ack(e.to_string()))?;
        Ok(())
    }
}
