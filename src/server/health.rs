use axum::extract::State;
use axum::routing::get;
use axum::Router;
use http::Uri;
use serde::Serialize;

use crate::helpers::time::now_millis;
use crate::server::response::{ApiError, ApiSuccess};
use crate::server::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    status: &'static str,
    timestamp: i64,
    /// seconds since the server started
    uptime: f64,
}

/// Liveness routes, never prefixed.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ping", get(ping))
}

async fn health(State(state): State<AppState>) -> ApiSuccess<HealthStatus> {
    ApiSuccess::new(HealthStatus {
        status: "ok",
        timestamp: now_millis(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

async fn ping() -> ApiSuccess<&'static str> {
    ApiSuccess::new("pong")
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("route {} does not exist", uri.path()))
}
