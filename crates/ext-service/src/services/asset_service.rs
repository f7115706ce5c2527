//! Daily asset multiplier service.
//!
//! Each (user, calendar day) pair gets one log-normal multiplier
//! `exp(μ + σZ)` with `μ = -σ²/2`, so the expected multiplier is 1. The
//! multiplier is clamped to `[1 + min%, 1 + max%]` and cached so repeated
//! updates on the same day reuse it.

use crate::config::AssetConfig;
use crate::models::UpdateAssetResponse;
use crate::observability::metrics;
use crate::services::normal::NormalGenerator;
use chrono::{DateTime, NaiveDate, Utc};
use moka::sync::Cache;
use std::sync::Arc;
use thiserror::Error;

/// Asset update errors. Both are client errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset must not be null")]
    MissingAsset,

    #[error("asset must be >= 0")]
    NegativeAsset,
}

/// Applies the daily multiplier to user assets.
pub struct AssetService {
    config: AssetConfig,
    normal: Arc<dyn NormalGenerator>,
    daily_multiplier: Cache<(i64, NaiveDate), f64>,
}

impl AssetService {
    pub fn new(config: AssetConfig, normal: Arc<dyn NormalGenerator>) -> Self {
        let daily_multiplier = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            config,
            normal,
            daily_multiplier,
        }
    }

    /// Update a user's asset using today's multiplier.
    ///
    /// # Errors
    ///
    /// Returns `AssetError` when the asset is absent or negative.
    pub fn update_asset(
        &self,
        user_id: i64,
        asset: Option<i64>,
    ) -> Result<UpdateAssetResponse, AssetError> {
        self.update_asset_at(user_id, asset, Utc::now())
    }

    /// Update a user's asset as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AssetError` when the asset is absent or negative.
    pub fn update_asset_at(
        &self,
        user_id: i64,
        asset: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<UpdateAssetResponse, AssetError> {
        let original = asset.ok_or(AssetError::MissingAsset)?;
        if original < 0 {
            return Err(AssetError::NegativeAsset);
        }

        let today = now.with_timezone(&self.config.utc_offset).date_naive();

        let entry = self
            .daily_multiplier
            .entry((user_id, today))
            .or_insert_with(|| self.draw_multiplier());
        let source = if entry.is_fresh() { "drawn" } else { "cached" };
        let multiplier = entry.into_value();

        // `as` saturates; the clamp keeps the product within a few percent
        let updated = ((original as f64) * multiplier).round().max(0.0) as i64;

        tracing::info!(
            target: "ext.services.asset",
            user_id,
            date = %today,
            original,
            multiplier = %format!("{multiplier:.6}"),
            updated,
            change_percent = %format!("{:.2}", (multiplier - 1.0) * 100.0),
            "Asset updated"
        );
        metrics::record_asset_update(source);

        Ok(UpdateAssetResponse {
            user_id,
            original_asset: original,
            multiplier,
            updated_asset: updated,
            date: today.format("%Y-%m-%d").to_string(),
        })
    }

    /// `exp(-σ²/2 + σZ)` clamped to the configured band.
    fn draw_multiplier(&self) -> f64 {
        let sigma = self.config.volatility_sigma;
        let mu = -0.5 * sigma * sigma;
        let raw = (mu + sigma * self.normal.next_z()).exp();

        let min = 1.0 + self.config.clamp_min_percent / 100.0;
        let max = 1.0 + self.config.clamp_max_percent / 100.0;
        raw.clamp(min, max)
    }
}
