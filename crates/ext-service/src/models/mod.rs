//! Extension service models.
//!
//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// Readiness probe response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// "loaded" when a verification key is cached, "missing" otherwise.
    pub inter_server_key: String,
}

// ============================================================================
// Asset API Models
// ============================================================================

/// Request body for `POST {prefix}/update-asset/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateAssetRequest {
    /// Current asset value. Absent or null is rejected by the service.
    #[serde(default)]
    pub asset: Option<i64>,
}

/// Response body for `POST {prefix}/update-asset/{user_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetResponse {
    pub user_id: i64,
    pub original_asset: i64,
    /// Multiplier applied today, shared by every update of this user today.
    pub multiplier: f64,
    pub updated_asset: i64,
    /// Calendar day (YYYY-MM-DD) in the configured offset.
    pub date: String,
}
