//! Event geometry handlers.

use std::sync::Arc;

use avalanche_common::{ApiError, BoundingBox, FeatureCollection};
use axum::{
    extract::{Extension, Path, Query},
    response::Response,
};
use storage::{EventGeometry, EventQuery};

use super::common::{db_error, error_response, json_response, parse_edges, FilterParams, GEO_JSON};
use crate::state::AppState;

/// GET /api/events/polygons/
pub async fn polygons_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Response {
    respond(events(&state, EventGeometry::Polygons, &params, None).await)
}

/// GET /api/events/polygons/within/:w/:s/:e/:n/
pub async fn polygons_within_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(edges): Path<(String, String, String, String)>,
    Query(params): Query<FilterParams>,
) -> Response {
    let bbox = match parse_edges(edges) {
        Ok(bbox) => bbox,
        Err(e) => return error_response(&e),
    };
    respond(events(&state, EventGeometry::Polygons, &params, Some(bbox)).await)
}

/// GET /api/events/points/
pub async fn points_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Response {
    respond(events(&state, EventGeometry::Points, &params, None).await)
}

/// GET /api/events/points/within/:w/:s/:e/:n/
pub async fn points_within_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(edges): Path<(String, String, String, String)>,
    Query(params): Query<FilterParams>,
) -> Response {
    let bbox = match parse_edges(edges) {
        Ok(bbox) => bbox,
        Err(e) => return error_response(&e),
    };
    respond(events(&state, EventGeometry::Points, &params, Some(bbox)).await)
}

async fn events(
    state: &AppState,
    geometry: EventGeometry,
    params: &FilterParams,
    bbox: Option<BoundingBox>,
) -> Result<FeatureCollection, ApiError> {
    let range = params.date_range()?;
    let regions = params.regions()?;

    let mut query = EventQuery::new(geometry, range).in_regions(regions);
    if let Some(bbox) = bbox {
        query = query.within(bbox);
    }

    let collection = state.executor.run(&query).await.map_err(db_error)?;

    tracing::debug!(
        geometry = ?geometry,
        start = %range.start,
        end = %range.end,
        features = collection.len(),
        "Event query complete"
    );

    Ok(collection)
}

fn respond(result: Result<FeatureCollection, ApiError>) -> Response {
    match result {
        Ok(collection) => json_response(&collection, GEO_JSON),
        Err(e) => error_response(&e),
    }
}
