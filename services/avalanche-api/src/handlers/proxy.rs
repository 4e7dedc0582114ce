//! Referer-gated imagery pass-through.

use std::sync::Arc;

use avalanche_common::ApiError;
use axum::{
    extract::{Extension, Path, RawQuery},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, warn};

use super::common::error_response;
use crate::state::AppState;

/// GET /api/proxy/imagery/*path
pub async fn imagery_proxy_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());

    if !state.proxy.is_allowed(referer) {
        counter!("http_proxy_forbidden_total").increment(1);
        debug!(referer = ?referer, "Rejected imagery proxy request");
        return error_response(&ApiError::Forbidden);
    }

    let Some(url) = state.proxy.upstream_url_for(&path, query.as_deref()) else {
        return error_response(&ApiError::UpstreamError(
            "no imagery upstream configured".to_string(),
        ));
    };

    match forward(&state.http_client, &url).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %url, error = %e, "Imagery upstream request failed");
            error_response(&e)
        }
    }
}

async fn forward(client: &reqwest::Client, url: &str) -> Result<Response, ApiError> {
    let upstream = client
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::UpstreamError(e.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::UpstreamError(e.to_string()))?;

    Ok((status, [(header::CONTENT_TYPE, content_type)], body).into_response())
}
