//! Aggregate statistics handlers.

use std::sync::Arc;

use avalanche_common::{ApiError, BoundingBox};
use axum::{
    extract::{Extension, Path, Query},
    response::Response,
};
use storage::{Statistics, StatisticsQuery};

use super::common::{db_error, error_response, json_response, parse_edges, FilterParams};
use crate::state::AppState;

/// GET /api/statistics/
pub async fn statistics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Response {
    match statistics(&state, &params, None).await {
        Ok(stats) => json_response(&stats, "application/json"),
        Err(e) => error_response(&e),
    }
}

/// GET /api/statistics/within/:w/:s/:e/:n/
pub async fn statistics_within_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(edges): Path<(String, String, String, String)>,
    Query(params): Query<FilterParams>,
) -> Response {
    let result = match parse_edges(edges) {
        Ok(bbox) => statistics(&state, &params, Some(bbox)).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(stats) => json_response(&stats, "application/json"),
        Err(e) => error_response(&e),
    }
}

async fn statistics(
    state: &AppState,
    params: &FilterParams,
    bbox: Option<BoundingBox>,
) -> Result<Statistics, ApiError> {
    let mut query = StatisticsQuery::new(params.date_range()?).in_regions(params.regions()?);
    if let Some(bbox) = bbox {
        query = query.within(bbox);
    }

    state.executor.run(&query).await.map_err(db_error)
}
