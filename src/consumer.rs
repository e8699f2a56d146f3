//! Kafka message source.
//!
//! Wraps an rdkafka `StreamConsumer` behind the narrow [`MessageSource`]
//! seam the consume loop depends on. Offset management is delegated to the
//! consumer group: offsets are auto-committed by librdkafka, giving
//! at-least-once delivery keyed to a durable group id. Redelivery after a
//! crash is expected; the persistence gateway's duplicate check absorbs it.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use tracing::info;

use crate::config::KafkaOpts;
use crate::error::{IngestError, Result};

/// A raw message pulled from the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedMessage {
    pub payload: Vec<u8>,
    pub offset: i64,
}

/// Narrow read interface the consume loop depends on.
///
/// `read_next` issues one bounded read. `Ok(None)` means the wait elapsed
/// with no message, which is expected steady-state behavior; the timeout is
/// a polling interval, not a correctness mechanism.
#[async_trait]
pub trait MessageSource {
    async fn read_next(&self, timeout: Duration) -> Result<Option<SourcedMessage>>;
}

/// Kafka-backed [`MessageSource`] using a consumer group.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Build and subscribe a SASL/SCRAM-authenticated consumer.
    ///
    /// New consumer groups start from the latest offset; established groups
    /// resume from their committed position.
    pub fn new(opts: &KafkaOpts) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &opts.broker)
            .set("group.id", &opts.group_id)
            .set("session.timeout.ms", &opts.session_timeout_ms)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", "SCRAM-SHA-256")
            .set("sasl.username", &opts.username)
            .set("sasl.password", &opts.password)
            .create()?;

        consumer.subscribe(&[&opts.topic])?;
        info!(
            "Kafka consumer started for topic {} with group id {}",
            opts.topic, opts.group_id
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn read_next(&self, timeout: Duration) -> Result<Option<SourcedMessage>> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            // Wait bound elapsed with no message.
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(IngestError::Read(e.to_string())),
            Ok(Ok(message)) => Ok(Some(SourcedMessage {
                payload: message.payload().unwrap_or_default().to_vec(),
                offset: message.offset(),
            })),
        }
    }
}
