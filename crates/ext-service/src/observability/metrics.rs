//! Metrics definitions for the extension service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ext_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 2 values (accepted, rejected)
//! - `kind`: bounded by `ValidationError` variants plus `none`
//! - `status`: bounded by `KeyStoreError` variants plus `success`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Key fetches are bounded by the client timeouts (3s default)
        .set_buckets_for_metric(
            Matcher::Prefix("ext_key_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 3.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set key fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Authentication Gate Metrics
// ============================================================================

/// Record a gate decision.
///
/// Metric: `ext_auth_requests_total`
/// Labels: `outcome`, `kind`
pub fn record_auth_request(outcome: &'static str, kind: &'static str) {
    counter!("ext_auth_requests_total",
        "outcome" => outcome,
        "kind" => kind
    )
    .increment(1);
}

// ============================================================================
// Key Store Metrics
// ============================================================================

/// Record a public key fetch attempt.
///
/// Metric: `ext_key_fetch_total`, `ext_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &'static str, duration: Duration) {
    histogram!("ext_key_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("ext_key_fetch_total",
        "status" => status
    )
    .increment(1);
}

/// Publish whether a verification key is currently cached.
///
/// Metric: `ext_key_loaded` (1 = loaded, 0 = missing)
pub fn set_key_loaded(loaded: bool) {
    gauge!("ext_key_loaded").set(if loaded { 1.0 } else { 0.0 });
}

// ============================================================================
// Asset Metrics
// ============================================================================

/// Record an asset update.
///
/// Metric: `ext_asset_updates_total`
/// Labels: `multiplier_source` (drawn, cached)
pub fn record_asset_update(multiplier_source: &'static str) {
    counter!("ext_asset_updates_total",
        "multiplier_source" => multiplier_source
    )
    .increment(1);
}
