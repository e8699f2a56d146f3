//! The consume loop.
//!
//! One sequential worker: read with a bounded wait, accumulate a batch,
//! flush the batch through the persistence gateway, repeat. Per-message
//! failures (decode, lookup, insert) are logged and isolated so one bad
//! message never poisons the rest of a batch or stops the stream. Only
//! process-level shutdown terminates the loop under normal operation.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consumer::{MessageSource, SourcedMessage};
use crate::error::{IngestError, Result};
use crate::record::decode_event;
use crate::sink::EventSink;

/// Tuning for the consume loop.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Number of messages accumulated before a flush.
    pub batch_size: usize,
    /// Bounded wait per read; purely a polling interval.
    pub poll_timeout: Duration,
    /// Stop after this many messages have been read. Used by tests and load
    /// runs; `None` means run until process shutdown.
    pub max_messages: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_timeout: Duration::from_secs(10),
            max_messages: None,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory batch owned by the loop, never shared.
#[derive(Debug, Default)]
struct Batch {
    messages: Vec<SourcedMessage>,
}

impl Batch {
    fn push(&mut self, message: SourcedMessage) {
        self.messages.push(message);
    }

    fn is_full(&self, threshold: usize) -> bool {
        self.messages.len() >= threshold
    }

    fn take(&mut self) -> Vec<SourcedMessage> {
        std::mem::take(&mut self.messages)
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Run the consume-decode-persist loop until shutdown (or until
/// `max_messages` when set).
pub async fn run_ingest<S, K>(source: &S, sink: &K, config: &IngestConfig) -> Result<()>
where
    S: MessageSource,
    K: EventSink,
{
    config.validate()?;
    info!(
        "Starting ingest loop (batch_size={}, poll_timeout={:?})",
        config.batch_size, config.poll_timeout
    );

    let mut batch = Batch::default();
    let mut messages_read: u64 = 0;

    loop {
        match source.read_next(config.poll_timeout).await {
            Ok(Some(message)) => {
                debug!(
                    "Received message at offset {}: {}",
                    message.offset,
                    String::from_utf8_lossy(&message.payload)
                );
                batch.push(message);
                messages_read += 1;

                if batch.is_full(config.batch_size) {
                    flush_batch(sink, batch.take()).await;
                }
            }
            Ok(None) => {
                debug!("No new messages, waiting...");
            }
            // Offset is not advanced for a failed read, so the bus redelivers
            // from its committed position on the next successful read.
            Err(e) => {
                warn!("Error reading message from bus: {e}");
            }
        }

        if let Some(max) = config.max_messages {
            if messages_read >= max {
                if !batch.is_empty() {
                    flush_batch(sink, batch.take()).await;
                }
                info!("Reached max_messages limit ({max}), stopping ingest loop");
                return Ok(());
            }
        }
    }
}

/// Decode and persist every message in a completed batch, in delivery order.
///
/// Individual failures are logged and dropped; the batch always completes.
async fn flush_batch<K: EventSink>(sink: &K, messages: Vec<SourcedMessage>) {
    for message in messages {
        let event = match decode_event(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Error decoding message at offset {}: {e} (payload: {})",
                    message.offset,
                    String::from_utf8_lossy(&message.payload)
                );
                continue;
            }
        };

        match sink.persist(&event).await {
            Ok(true) => debug!(
                "Persisted event {} from offset {}",
                event.activity_uuid, message.offset
            ),
            Ok(false) => debug!(
                "Duplicate event {} at offset {}, skipped",
                event.activity_uuid, message.offset
            ),
            Err(e) => warn!("Error persisting event {}: {e}", event.activity_uuid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(offset: i64) -> SourcedMessage {
        SourcedMessage {
            payload: b"{}".to_vec(),
            offset,
        }
    }

    #[test]
    fn test_batch_reaches_threshold() {
        let mut batch = Batch::default();
        batch.push(message(0));
        assert!(!batch.is_full(2));
        batch.push(message(1));
        assert!(batch.is_full(2));
    }

    #[test]
    fn test_batch_take_clears() {
        let mut batch = Batch::default();
        batch.push(message(5));
        batch.push(message(6));

        let taken = batch.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].offset, 5);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_config_rejects_zero_batch_size() {
        let config = IngestConfig {
            batch_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(IngestConfig::default().validate().is_ok());
    }
}
