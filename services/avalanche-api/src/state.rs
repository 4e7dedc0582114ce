//! Application state for the avalanche API.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{ConnectionPool, PgManager, QueryExecutor};

use crate::config::{ProxyConfig, ServiceConfig};

/// Shared application state.
pub struct AppState {
    /// Runs event and statistics queries on the connection pool.
    pub executor: QueryExecutor<PgManager>,

    /// Client for the imagery proxy.
    pub http_client: reqwest::Client,

    /// Imagery proxy settings.
    pub proxy: ProxyConfig,

    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Open the connection pool and build the HTTP client.
    pub async fn new(config: &ServiceConfig) -> Result<Self> {
        let pool = ConnectionPool::new(PgManager::new(&config.database_url), config.pool.clone())
            .await
            .context("Failed to open initial database connections")?;

        let executor = QueryExecutor::new(pool, config.retry.clone());

        let http_client = reqwest::Client::builder()
            .timeout(config.proxy.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            executor,
            http_client,
            proxy: config.proxy.clone(),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
