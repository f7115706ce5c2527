//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - reports whether the inter-server key is cached
//!
//! Neither endpoint sits behind the authentication gate.

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Does not fetch: a missing key is reported, and the next protected
/// request retries the fetch.
#[tracing::instrument(skip_all, name = "ext.health.readiness")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    if state.key_store.is_loaded() {
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                inter_server_key: "loaded".to_string(),
            }),
        );
    }

    tracing::warn!(
        target: "ext.health",
        "Readiness check failed: inter-server public key not loaded"
    );
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ReadinessResponse {
            status: "not_ready".to_string(),
            inter_server_key: "missing".to_string(),
        }),
    )
}
