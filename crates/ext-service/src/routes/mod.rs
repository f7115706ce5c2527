//! HTTP routes for the extension service.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeyProvider, PublicKeyStore, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_inter_server_auth, AuthState};
use crate::services::{AssetService, NormalGenerator};
use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Cache of the name server's public key.
    pub key_store: Arc<PublicKeyStore>,

    /// Verifier used by the authentication gate.
    pub verifier: Arc<TokenVerifier>,

    /// Daily asset multiplier service.
    pub asset_service: Arc<AssetService>,
}

impl AppState {
    /// Wire the verifier and asset service around an existing key store.
    pub fn new(
        config: Config,
        key_store: Arc<PublicKeyStore>,
        normal: Arc<dyn NormalGenerator>,
    ) -> Self {
        let keys: Arc<dyn KeyProvider> = key_store.clone();
        let verifier = Arc::new(TokenVerifier::from_config(keys, &config));
        let asset_service = Arc::new(AssetService::new(config.asset.clone(), normal));

        Self {
            config,
            key_store,
            verifier,
            asset_service,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready`, `/metrics` - open operational endpoints
/// - `{prefix}/me`, `{prefix}/update-asset/:user_id` - behind the gate
/// - TraceLayer for request logging
/// - 30 second request timeout
///
/// Every path under the prefix, including unknown ones, passes the gate
/// first, so unauthenticated callers see 401 rather than 404.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: state.verifier.clone(),
    });
    let prefix = state.config.protected_path_prefix.clone();

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (inter-server authentication required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route("/update-asset/:user_id", post(handlers::update_asset))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(
            auth_state,
            require_inter_server_auth,
        ))
        .with_state(state);

    // Apply global middleware layers
    public_routes
        .merge(metrics_routes)
        .nest(&prefix, protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
