//! activity-ingest
//!
//! A service that consumes user-activity events from a Kafka topic and
//! persists each event exactly once into a PostgreSQL table, keeping the
//! table's schema self-healing against drift.
//!
//! # Features
//!
//! - Consumer groups: durable group id with auto-committed offsets for
//!   at-least-once delivery and resumption after restart
//! - Schema reconciliation: the destination table is created when absent and
//!   recreated when its column set drifts from the canonical definition
//! - Idempotent persistence: duplicate `activity_uuid`s are skipped, with
//!   the table's primary key as the authoritative backstop
//! - Partial-failure isolation: a malformed or unpersistable message is
//!   logged and dropped without stopping the stream
//!
//! # Pipeline
//!
//! ```text
//! Kafka topic -> consume loop -> JSON codec -> persistence gateway -> PostgreSQL
//!                                  (schema reconciled once at startup)
//! ```

/// Environment-sourced CLI options
pub mod config;

/// Destination store connection construction
pub mod connect;

/// Kafka message source behind the `MessageSource` seam
pub mod consumer;

pub mod error;

/// Activity event record and JSON codec
pub mod record;

/// Schema reconciliation for the destination table
pub mod schema;

/// Idempotent persistence gateway
pub mod sink;

/// The consume-decode-persist loop
pub mod sync;

/// In-memory fakes and sample payloads for tests
pub mod testing;

pub use config::{KafkaOpts, StoreOpts};
pub use connect::connect_to_postgres;
pub use consumer::{KafkaSource, MessageSource, SourcedMessage};
pub use error::{IngestError, Result};
pub use record::{decode_event, ActivityEvent};
pub use schema::{ensure_table, EXPECTED_COLUMNS, TABLE_NAME};
pub use sink::{EventSink, PostgresSink};
pub use sync::{run_ingest, IngestConfig};
