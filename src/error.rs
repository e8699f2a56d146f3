//! Error types for activity-ingest.

use thiserror::Error;

/// Errors that can occur while ingesting activity events.
///
/// `Config`, `Connectivity` and `Reconciliation` are fatal: the process must
/// not consume messages with unknown configuration, an unreachable store, or
/// an unverified table schema. Everything else is a per-message failure that
/// is logged and skipped so the stream keeps flowing.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("destination store unreachable: {0}")]
    Connectivity(#[source] tokio_postgres::Error),

    #[error("schema reconciliation failed: {0}")]
    Reconciliation(#[source] tokio_postgres::Error),

    #[error("bus read failed: {0}")]
    Read(String),

    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("duplicate lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("insert failed: {0}")]
    Insert(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
    /// Whether this error must terminate the process rather than the
    /// current message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Config(_) | IngestError::Connectivity(_) | IngestError::Reconciliation(_)
        )
    }
}

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;
