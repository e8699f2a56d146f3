//! Destination store connection construction.

use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use crate::error::{IngestError, Result};

/// Connect to PostgreSQL, spawn the connection driver task, and verify the
/// link with a ping. An unreachable store is fatal at startup.
pub async fn connect_to_postgres(conn_str: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
        .await
        .map_err(IngestError::Connectivity)?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {e}");
        }
    });

    client
        .query_one("SELECT 1", &[])
        .await
        .map_err(IngestError::Connectivity)?;
    info!("Connected to the PostgreSQL database");

    Ok(client)
}
