//! Schema reconciliation for the destination table.
//!
//! The `user_activity` table is owned by the database, not by this process,
//! so its live shape has to be verified before any write is trusted. The
//! policy is blunt self-healing: if the column set diverges from the
//! canonical definition in either direction, the table is dropped and
//! recreated. Any database error during a reconciliation pass is fatal to
//! startup since writes cannot be trusted afterwards.

use tokio_postgres::Client;
use tracing::{info, warn};

use crate::error::{IngestError, Result};

/// Destination table name.
pub const TABLE_NAME: &str = "user_activity";

/// Canonical column set, in ordinal order. `activity_uuid` is the primary
/// key; every other column is nullable.
pub const EXPECTED_COLUMNS: [&str; 20] = [
    "activity_uuid",
    "user_uid",
    "organization_id",
    "timestamp",
    "app_name",
    "url",
    "page_title",
    "productivity_status",
    "meridian",
    "ip_address",
    "mac_address",
    "mouse_movement",
    "mouse_clicks",
    "keys_clicks",
    "status",
    "cpu_usage",
    "ram_usage",
    "screenshot_uid",
    "thumbnail_uid",
    "device_user_name",
];

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS user_activity (
        activity_uuid VARCHAR(255) PRIMARY KEY,
        user_uid VARCHAR(255),
        organization_id VARCHAR(255),
        timestamp TIMESTAMP,
        app_name VARCHAR(255),
        url VARCHAR(255),
        page_title VARCHAR(255),
        productivity_status VARCHAR(255),
        meridian VARCHAR(255),
        ip_address VARCHAR(255),
        mac_address VARCHAR(255),
        mouse_movement BOOLEAN,
        mouse_clicks INTEGER,
        keys_clicks INTEGER,
        status INTEGER,
        cpu_usage VARCHAR(255),
        ram_usage VARCHAR(255),
        screenshot_uid VARCHAR(255),
        thumbnail_uid VARCHAR(255),
        device_user_name VARCHAR(50)
    )";

/// One live column as reported by the catalog.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub default: Option<String>,
}

/// Divergence between the live column set and [`EXPECTED_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDrift {
    /// Expected columns absent from the live table.
    pub missing: Vec<String>,
    /// Live columns not in the expected set.
    pub unexpected: Vec<String>,
}

impl SchemaDrift {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Guarantee the destination table exists with the expected column set.
///
/// Creates the table when absent, validates (and on drift recreates) it when
/// present. Must run before the first write.
pub async fn ensure_table(client: &Client) -> Result<()> {
    if table_exists(client, TABLE_NAME).await? {
        validate_schema(client).await
    } else {
        create_table(client).await
    }
}

async fn table_exists(client: &Client, table_name: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = $1",
            &[&table_name],
        )
        .await
        .map_err(IngestError::Reconciliation)?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}

async fn create_table(client: &Client) -> Result<()> {
    client
        .execute(CREATE_TABLE_SQL, &[])
        .await
        .map_err(IngestError::Reconciliation)?;
    info!("Table '{TABLE_NAME}' created");
    Ok(())
}

/// Diff the live column list against the expected set and self-heal on
/// drift. A clean pass is a no-op.
pub async fn validate_schema(client: &Client) -> Result<()> {
    let live: Vec<String> = client
        .query(
            "SELECT column_name FROM information_schema.columns
             WHERE table_name = $1 AND table_schema = 'public'
             ORDER BY ordinal_position",
            &[&TABLE_NAME],
        )
        .await
        .map_err(IngestError::Reconciliation)?
        .iter()
        .map(|row| row.get::<_, String>(0))
        .collect();

    let drift = diff_columns(&live);
    for column in &drift.unexpected {
        warn!("Unexpected column found: {column}");
    }
    for column in &drift.missing {
        warn!("Missing column: {column}");
    }

    if drift.is_empty() {
        info!("Table schema validation passed");
        Ok(())
    } else {
        warn!("Schema drift detected, recreating table '{TABLE_NAME}'");
        recreate_table(client).await
    }
}

/// Compute drift between a live column list and [`EXPECTED_COLUMNS`].
pub fn diff_columns(live: &[String]) -> SchemaDrift {
    let mut drift = SchemaDrift::default();
    for column in live {
        if !EXPECTED_COLUMNS.contains(&column.as_str()) {
            drift.unexpected.push(column.clone());
        }
    }
    for column in EXPECTED_COLUMNS {
        if !live.iter().any(|c| c == column) {
            drift.missing.push(column.to_string());
        }
    }
    drift
}

/// Drop the table unconditionally and recreate it from the canonical
/// definition. Loses all data.
pub async fn recreate_table(client: &Client) -> Result<()> {
    client
        .execute("DROP TABLE IF EXISTS user_activity", &[])
        .await
        .map_err(IngestError::Reconciliation)?;
    info!("Dropped existing table '{TABLE_NAME}'");
    create_table(client).await
}

/// Read the live table structure from the catalog for startup reporting.
pub async fn describe_table(client: &Client) -> Result<Vec<ColumnInfo>> {
    let rows = client
        .query(
            "SELECT column_name, data_type, is_nullable, column_default
             FROM information_schema.columns
             WHERE table_name = $1 AND table_schema = 'public'
             ORDER BY ordinal_position",
            &[&TABLE_NAME],
        )
        .await
        .map_err(IngestError::Reconciliation)?;

    Ok(rows
        .iter()
        .map(|row| ColumnInfo {
            name: row.get(0),
            data_type: row.get(1),
            is_nullable: row.get(2),
            default: row.get(3),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_as_strings() -> Vec<String> {
        EXPECTED_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_expected_columns_cover_all_event_fields() {
        assert_eq!(EXPECTED_COLUMNS.len(), 20);
        // Each expected column must appear in the table definition.
        for column in EXPECTED_COLUMNS {
            assert!(
                CREATE_TABLE_SQL.contains(column),
                "column {column} missing from CREATE TABLE"
            );
        }
    }

    #[test]
    fn test_diff_clean_schema() {
        let drift = diff_columns(&expected_as_strings());
        assert!(drift.is_empty());
    }

    #[test]
    fn test_diff_detects_missing_column() {
        let mut live = expected_as_strings();
        live.retain(|c| c != "thumbnail_uid");

        let drift = diff_columns(&live);
        assert_eq!(drift.missing, vec!["thumbnail_uid".to_string()]);
        assert!(drift.unexpected.is_empty());
    }

    #[test]
    fn test_diff_detects_unexpected_column() {
        let mut live = expected_as_strings();
        live.push("legacy_session_id".to_string());

        let drift = diff_columns(&live);
        assert!(drift.missing.is_empty());
        assert_eq!(drift.unexpected, vec!["legacy_session_id".to_string()]);
    }

    #[test]
    fn test_diff_detects_both_directions_at_once() {
        let mut live = expected_as_strings();
        live.retain(|c| c != "meridian");
        live.push("extra".to_string());

        let drift = diff_columns(&live);
        assert_eq!(drift.missing, vec!["meridian".to_string()]);
        assert_eq!(drift.unexpected, vec!["extra".to_string()]);
        assert!(!drift.is_empty());
    }

    #[test]
    fn test_diff_empty_live_list_reports_all_missing() {
        let drift = diff_columns(&[]);
        assert_eq!(drift.missing.len(), 20);
        assert!(drift.unexpected.is_empty());
    }
}
