//! Query execution with reinitialize-and-retry on query-level failures.

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::error::DbError;
use crate::manager::Manager;
use crate::pool::ConnectionPool;
use crate::retry::RetryPolicy;

/// A parameterized statement and the transform of its result set.
#[async_trait]
pub trait Query<C>: Send + Sync {
    type Output: Send;

    /// Name used in logs and metrics.
    fn name(&self) -> &'static str {
        "query"
    }

    /// Run against a checked-out connection.
    ///
    /// Failures of the statement itself must be reported as [`DbError::Query`]
    /// for the executor to retry them.
    async fn execute(&self, conn: &mut C) -> Result<Self::Output, DbError>;
}

/// Runs queries on pooled connections.
///
/// A query-level failure is never returned to the caller by default: the
/// connection is flagged for reinitialization, the executor sleeps for the
/// next backoff delay and tries again on a reinitialized connection. Any
/// other error, including failure to open a connection, is returned at once.
pub struct QueryExecutor<M: Manager> {
    pool: ConnectionPool<M>,
    policy: RetryPolicy,
}

impl<M: Manager> Clone for QueryExecutor<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<M: Manager> QueryExecutor<M> {
    pub fn new(pool: ConnectionPool<M>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &ConnectionPool<M> {
        &self.pool
    }

    #[instrument(skip_all, fields(query = query.name()))]
    pub async fn run<Q>(&self, query: &Q) -> Result<Q::Output, DbError>
    where
        Q: Query<M::Connection>,
    {
        let mut backoff = self.policy.backoff();
        let mut reinitialize = false;
        let mut retries: u32 = 0;

        loop {
            let mut conn = self.pool.acquire(reinitialize).await?;

            let err = match query.execute(&mut *conn).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            conn.mark_for_reinit();
            let slot = conn.index();
            drop(conn);

            if let Some(max) = self.policy.max_retries {
                if retries >= max {
                    return Err(DbError::RetriesExhausted {
                        attempts: retries + 1,
                        last_error: err.to_string(),
                    });
                }
            }

            let delay = backoff.next().unwrap_or(self.policy.unit);
            retries += 1;
            metrics::counter!("db_query_retries_total", "query" => query.name()).increment(1);
            warn!(
                error = %err,
                slot = slot,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                "Query failed, reinitializing connection and retrying"
            );

            tokio::time::sleep(delay).await;
            reinitialize = true;
        }
    }
}
