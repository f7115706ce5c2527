//! Asset update handler.

use crate::auth::AuthenticatedIdentity;
use crate::errors::ExtError;
use crate::models::{UpdateAssetRequest, UpdateAssetResponse};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST {prefix}/update-asset/{user_id}
///
/// ## Request
///
/// ```json
/// { "asset": 1000000 }
/// ```
///
/// ## Response
///
/// ```json
/// {
///   "userId": 42,
///   "originalAsset": 1000000,
///   "multiplier": 1.0123,
///   "updatedAsset": 1012300,
///   "date": "2025-01-15"
/// }
/// ```
///
/// ## Errors
///
/// - 400 Bad Request for a non-numeric user id, malformed body, or a
///   missing or negative asset
#[instrument(skip_all, name = "ext.handlers.update_asset")]
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    user_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAssetRequest>, JsonRejection>,
) -> Result<Json<UpdateAssetResponse>, ExtError> {
    let Path(user_id) = user_id.map_err(|e| {
        tracing::debug!(target: "ext.handlers.asset", error = %e, "Invalid user id");
        ExtError::BadRequest("user id must be an integer".to_string())
    })?;

    let Json(request) = body.map_err(|e| {
        tracing::debug!(target: "ext.handlers.asset", error = %e, "Invalid request body");
        ExtError::BadRequest("request body must be JSON with a numeric asset".to_string())
    })?;

    tracing::debug!(
        target: "ext.handlers.asset",
        authority = %identity.authority(),
        user_id,
        "Updating asset"
    );

    state
        .asset_service
        .update_asset(user_id, request.asset)
        .map(Json)
        .map_err(|e| ExtError::BadRequest(e.to_string()))
}
