use axum::{Router, routing};
use http::StatusCode;

/// Liveness probe mounted at `path`; answers `200 ok` without touching upstreams
pub fn health_router(path: &str) -> Router {
    Router::new().route(path, routing::get(|| async { (StatusCode::OK, "ok") }))
}
