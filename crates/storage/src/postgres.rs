//! PostgreSQL connection manager.

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::debug;

use crate::error::DbError;
use crate::manager::Manager;
use crate::pool::ConnectionPool;

/// Opens single `sqlx` PostgreSQL connections for the pool.
#[derive(Debug, Clone)]
pub struct PgManager {
    database_url: String,
}

impl PgManager {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl Manager for PgManager {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, DbError> {
        PgConnection::connect(&self.database_url)
            .await
            .map_err(|e| DbError::Connect(e.to_string()))
    }

    async fn close(&self, conn: PgConnection) {
        // Broken connections usually fail to terminate cleanly.
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Error closing replaced connection");
        }
    }
}

/// Check that a pooled connection answers.
///
/// Goes straight to the pool rather than through the executor so that a dead
/// database fails the check instead of retrying forever. A failed ping flags
/// the slot for reinitialization.
pub async fn ping(pool: &ConnectionPool<PgManager>) -> Result<(), DbError> {
    let mut conn = pool.acquire(false).await?;
    let result = conn.ping().await.map_err(DbError::from_query);
    if result.is_err() {
        conn.mark_for_reinit();
    }
    result
}
