//! Router construction.

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

/// Build the application router.
///
/// Every API route answers with and without a trailing slash.
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let index = static_dir.join("html").join("index.html");

    Router::new()
        // Frontend
        .route_service("/", ServeFile::new(index))
        .nest_service("/static", ServeDir::new(static_dir))
        // Event geometries
        .route(
            "/api/events/polygons",
            get(handlers::events::polygons_handler),
        )
        .route(
            "/api/events/polygons/",
            get(handlers::events::polygons_handler),
        )
        .route(
            "/api/events/polygons/within/:w/:s/:e/:n",
            get(handlers::events::polygons_within_handler),
        )
        .route(
            "/api/events/polygons/within/:w/:s/:e/:n/",
            get(handlers::events::polygons_within_handler),
        )
        .route("/api/events/points", get(handlers::events::points_handler))
        .route("/api/events/points/", get(handlers::events::points_handler))
        .route(
            "/api/events/points/within/:w/:s/:e/:n",
            get(handlers::events::points_within_handler),
        )
        .route(
            "/api/events/points/within/:w/:s/:e/:n/",
            get(handlers::events::points_within_handler),
        )
        // Statistics
        .route(
            "/api/statistics",
            get(handlers::statistics::statistics_handler),
        )
        .route(
            "/api/statistics/",
            get(handlers::statistics::statistics_handler),
        )
        .route(
            "/api/statistics/within/:w/:s/:e/:n",
            get(handlers::statistics::statistics_within_handler),
        )
        .route(
            "/api/statistics/within/:w/:s/:e/:n/",
            get(handlers::statistics::statistics_within_handler),
        )
        // Imagery proxy
        .route(
            "/api/proxy/imagery/*path",
            get(handlers::proxy::imagery_proxy_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
