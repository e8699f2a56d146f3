//! Idempotent persistence of activity events.
//!
//! The gateway is create-once: a record is never updated after insert, and a
//! second persist for the same `activity_uuid` is a silent skip. The
//! fast-path duplicate check is check-then-act and therefore racy under
//! concurrent writers; the table's primary key is the authoritative
//! backstop, so a unique violation raised on insert is classified as a
//! duplicate skip, not an error.

use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::record::ActivityEvent;

/// Destination for decoded activity events.
#[async_trait]
pub trait EventSink {
    /// Persist one event. Returns `Ok(true)` when a new row was inserted and
    /// `Ok(false)` when a row with the same `activity_uuid` already existed.
    async fn persist(&self, event: &ActivityEvent) -> Result<bool>;

    /// Total number of persisted rows. Observability only, never used for
    /// control flow.
    async fn total_rows(&self) -> Result<i64>;
}

/// PostgreSQL-backed [`EventSink`] over a shared connection.
pub struct PostgresSink {
    client: Client,
}

impl PostgresSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn exists(&self, activity_uuid: &str) -> Result<bool> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) FROM user_activity WHERE activity_uuid = $1",
                &[&activity_uuid],
            )
            .await
            .map_err(|e| IngestError::Lookup(e.into()))?;
        let count: i64 = row.get(0);
        Ok(count > 0)
    }

    /// Insert the row without the duplicate pre-check.
    ///
    /// A unique violation from the table's primary key is classified as a
    /// duplicate skip (`Ok(false)`), never an error; this is the backstop
    /// `persist` relies on when two writers race past the pre-check.
    pub async fn insert_event(&self, event: &ActivityEvent) -> Result<bool> {
        let result = self
            .client
            .execute(
                "INSERT INTO user_activity (
                    activity_uuid, user_uid, organization_id, timestamp,
                    app_name, url, page_title, productivity_status, meridian,
                    ip_address, mac_address, mouse_movement, mouse_clicks,
                    keys_clicks, status, cpu_usage, ram_usage, screenshot_uid,
                    thumbnail_uid, device_user_name
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                           $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
                &[
                    &event.activity_uuid,
                    &event.user_uid,
                    &event.organization_id,
                    &event.timestamp.naive_utc(),
                    &event.app_name,
                    &event.url,
                    &event.page_title,
                    &event.productivity_status,
                    &event.meridian,
                    &event.ip_address,
                    &event.mac_address,
                    &event.mouse_movement,
                    &event.mouse_clicks,
                    &event.keys_clicks,
                    &event.status,
                    &event.cpu_usage,
                    &event.ram_usage,
                    &event.screenshot_uid,
                    &event.thumbnail_uid,
                    &event.device_user_name,
                ],
            )
            .await;

        if let Err(e) = result {
            // A concurrent writer won the race for this activity_uuid.
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                info!(
                    "Concurrent duplicate for activity_uuid {}, skipping",
                    event.activity_uuid
                );
                return Ok(false);
            }
            return Err(IngestError::Insert(e.into()));
        }

        Ok(true)
    }
}

#[async_trait]
impl EventSink for PostgresSink {
    async fn persist(&self, event: &ActivityEvent) -> Result<bool> {
        if self.exists(&event.activity_uuid).await? {
            info!(
                "Record with activity_uuid {} already exists, skipping",
                event.activity_uuid
            );
            return Ok(false);
        }

        debug!("Inserting new record for user {}", event.user_uid);
        let inserted = self.insert_event(event).await?;

        if inserted {
            match self.total_rows().await {
                Ok(count) => info!("Total records in user_activity table: {count}"),
                Err(e) => warn!("Failed to read row count after insert: {e}"),
            }
        }

        Ok(inserted)
    }

    async fn total_rows(&self) -> Result<i64> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) FROM user_activity", &[])
            .await
            .map_err(|e| IngestError::Lookup(e.into()))?;
        Ok(row.get(0))
    }
}
