//! Database access for the avalanche map services.
//!
//! Provides:
//! - A growable connection pool with per-slot reinitialization
//! - A query executor that retries query-level failures with capped backoff
//! - The PostgreSQL connection manager and the event/statistics queries

pub mod error;
pub mod events;
pub mod executor;
pub mod manager;
pub mod pool;
pub mod postgres;
pub mod retry;

pub use error::DbError;
pub use events::{collect_features, EventGeometry, EventQuery, Statistics, StatisticsQuery};
pub use executor::{Query, QueryExecutor};
pub use manager::Manager;
pub use pool::{ConnectionPool, PoolConfig, PoolStatus, PooledConnection};
pub use postgres::{ping, PgManager};
pub use retry::{Backoff, RetryPolicy};
