//! Services for the extension service.
//!
//! # Components
//!
//! - `asset_service` - Per-user daily asset multiplier
//! - `normal` - Standard normal sampling behind a trait seam

pub mod asset_service;
pub mod normal;

pub use asset_service::{AssetError, AssetService};
pub use normal::{BoxMullerGenerator, FixedNormal, NormalGenerator};
