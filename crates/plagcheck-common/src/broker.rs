//! AMQP broker client wrapper (§4.3.1, §5 "Shared resources").
//!
//! One `lapin::Connection` + one `lapin::Channel` shared by publisher and
//! consumer per process, the same sharing discipline the teacher applies to
//! its `DatabasePool` (`crates/matrixon-db/src/pool.rs`). Reconnection on
//! startup retries with bounded attempts and linear backoff, mirroring C1's
//! bucket-bootstrap resilience (§4.1, §9).

use crate::config::RabbitMqConfig;
use crate::error::{Result, ServiceError};
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct BrokerClient {
    channel: Channel,
    config: RabbitMqConfig,
}

const CONNECT_MAX_ATTEMPTS: u32 = 10;
const CONNECT_BASE_DELAY_MS: u64 = 250;

impl BrokerClient {
    /// Connect with bounded retries; each attempt waits `attempt * base_delay`.
    pub async fn connect(config: &RabbitMqConfig) -> Result<Self> {
        let mut last_err = None;
        for attempt in 1..=CONNECT_MAX_ATTEMPTS {
            match Connection::connect(&config.url, ConnectionProperties::default()).await {
                Ok(connection) => {
                    let channel = connection.create_channel().await.map_err(|e| {
                        ServiceError::ServiceUnavailable(format!("broker channel open failed: {e}"))
                    })?;
                    channel
                        .basic_qos(config.prefetch_count, BasicQosOptions::default())
                        .await
                        .map_err(|e| {
                            ServiceError::ServiceUnavailable(format!("broker qos failed: {e}"))
                        })?;
                    info!("✅ connected to broker after {attempt} attempt(s)");
                    let client = Self {
                        channel,
                        config: config.clone(),
                    };
                    client.declare_topology().await?;
                    return Ok(client);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "⚠️ broker connection attempt failed");
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_millis(CONNECT_BASE_DELAY_MS * attempt as u64))
                        .await;
                }
            }
        }
        Err(ServiceError::ServiceUnavailable(format!(
            "could not connect to broker after {CONNECT_MAX_ATTEMPTS} attempts: {:?}",
            last_err
        )))
    }

    async fn declare_topology(&self) -> Result<()> {
        self.channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("exchange declare failed: {e}")))?;

        self.channel
            .queue_declare(
                &self.config.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("queue declare failed: {e}")))?;

        if !self.config.routing_key.is_empty() {
            self.channel
                .queue_bind(
                    &self.config.queue_name,
                    &self.config.exchange,
                    &self.config.routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| ServiceError::ServiceUnavailable(format!("queue bind failed: {e}")))?;
        }
        debug!("🔧 broker topology declared");
        Ok(())
    }

    /// Publish a JSON-serialized payload to the configured exchange under `routing_key`.
    pub async fn publish<T: Serialize>(&self, routing_key: &str, payload: &T) -> Result<()> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| ServiceError::Internal(format!("event serialize failed: {e}")))?;
        self.channel
            .basic_publish(
                &self.config.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2), // persistent
            )
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("publish failed: {e}")))?
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("publish confirm failed: {e}")))?;
        Ok(())
    }

    /// Start consuming; returns a stream of deliveries the caller acks/nacks explicitly.
    pub async fn consume(&self) -> Result<lapin::Consumer> {
        self.channel
            .basic_consume(
                &self.config.queue_name,
                &self.config.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(format!("consume failed: {e}")))
    }
}

/// Acknowledge a delivery as successfully processed.
pub async fn ack(delivery: &lapin::message::Delivery) -> Result<()> {
    delivery
        .ack(BasicAckOptions::default())
        .await
        .map_err(|e| ServiceError::Internal(format!("ack failed: {e}")))
}

/// Nack a delivery with `requeue` set per the transient/permanent classification (§4.3, §4.4).
pub async fn nack(delivery: &lapin::message::Delivery, requeue: bool) -> Result<()> {
    delivery
        .nack(BasicNackOptions {
            requeue,
            ..Default::default()
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("nack failed: {e}")))
}

/// Helper for consumer loops: drain a `lapin::Consumer` stream, yielding items one at a time.
pub async fn next_delivery(
    consumer: &mut lapin::Consumer,
) -> Option<std::result::Result<lapin::message::Delivery, lapin::Error>> {
    consumer.next().await
}
