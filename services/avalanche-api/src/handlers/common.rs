//! Shared request parsing and response helpers.

use avalanche_common::{ApiError, BoundingBox, DateRange, RegionFilter};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use storage::DbError;

/// Content type for feature collection responses.
pub const GEO_JSON: &str = "application/geo+json";

/// Query parameters shared by the event and statistics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    /// First date, `YYYY-MM-DD`.
    pub start: Option<String>,

    /// Exclusive end date, `YYYY-MM-DD`.
    pub end: Option<String>,

    /// Comma-separated region ids.
    pub region: Option<String>,
}

impl FilterParams {
    pub fn date_range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::from_params(
            self.start.as_deref(),
            self.end.as_deref(),
        )?)
    }

    pub fn regions(&self) -> Result<RegionFilter, ApiError> {
        Ok(RegionFilter::parse(self.region.as_deref())?)
    }
}

/// Parse the `:w/:s/:e/:n` path segments of a `within` route.
pub fn parse_edges(
    (west, south, east, north): (String, String, String, String),
) -> Result<BoundingBox, ApiError> {
    Ok(BoundingBox::from_segments(&west, &south, &east, &north)?)
}

/// Map a storage failure to the error reported to clients.
pub fn db_error(err: DbError) -> ApiError {
    tracing::error!(error = %err, "Database query failed");
    ApiError::DatabaseError(err.to_string())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    description: String,
}

/// JSON error body with the status matching the error.
pub fn error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if matches!(err, ApiError::Forbidden) {
        return status.into_response();
    }

    let body = ErrorBody {
        code: err.code(),
        description: err.to_string(),
    };
    let json = serde_json::to_string(&body).unwrap_or_default();

    (status, [(header::CONTENT_TYPE, "application/json")], json).into_response()
}

/// Serialize `value` as a 200 response with the given content type.
pub fn json_response<T: Serialize>(value: &T, content_type: &'static str) -> Response {
    match serde_json::to_string(value) {
        Ok(json) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], json).into_response(),
        Err(e) => error_response(&ApiError::from(e)),
    }
}
