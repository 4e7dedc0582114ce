//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// Opening a connection failed. Never retried by the executor.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The database was reached but the statement failed, possibly because
    /// the connection went stale. Retried by the executor.
    #[error("Query failed: {0}")]
    Query(String),

    /// The result set did not have the expected shape.
    #[error("Failed to decode result: {0}")]
    Decode(String),

    #[error("Query abandoned after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Pool error: {0}")]
    Pool(String),
}

impl DbError {
    /// Whether the executor should reinitialize and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Query(_))
    }

    /// Classify an error raised while executing a statement.
    pub fn from_query(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => DbError::Decode(err.to_string()),
            sqlx::Error::Configuration(_) => DbError::Connect(err.to_string()),
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Decode(format!("JSON error: {}", err))
    }
}
