//! Error types for the avalanche map services.

use thiserror::Error;

use crate::bbox::BboxParseError;
use crate::region::RegionParseError;
use crate::time::TimeParseError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Forbidden")]
    Forbidden,

    // === Backend Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn invalid(param: impl Into<String>, message: impl ToString) -> Self {
        ApiError::InvalidParameter {
            param: param.into(),
            message: message.to_string(),
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "InvalidParameterValue",
            ApiError::Forbidden => "Forbidden",
            ApiError::DatabaseError(_) => "DatabaseError",
            ApiError::UpstreamError(_) => "BadGateway",
            ApiError::InternalError(_) => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ApiError::InvalidParameter { .. } => 400,
            ApiError::Forbidden => 403,
            ApiError::UpstreamError(_) => 502,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => 500,
        }
    }
}

impl From<TimeParseError> for ApiError {
    fn from(err: TimeParseError) -> Self {
        ApiError::invalid("start/end", err)
    }
}

impl From<RegionParseError> for ApiError {
    fn from(err: RegionParseError) -> Self {
        ApiError::invalid("region", err)
    }
}

impl From<BboxParseError> for ApiError {
    fn from(err: BboxParseError) -> Self {
        ApiError::invalid("bbox", err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InternalError(format!("JSON error: {}", err))
    }
}
