//! Connection lifecycle collaborator for the pool.

use async_trait::async_trait;

use crate::error::DbError;

/// Opens and closes the connections a [`ConnectionPool`](crate::ConnectionPool) manages.
#[async_trait]
pub trait Manager: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a new connection. Failures should be reported as [`DbError::Connect`].
    async fn connect(&self) -> Result<Self::Connection, DbError>;

    /// Dispose of a connection being replaced.
    async fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}
