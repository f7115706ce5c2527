//! HTTP request handlers for the extension service.

pub mod asset;
pub mod health;
pub mod me;
pub mod metrics;

pub use asset::update_asset;
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
