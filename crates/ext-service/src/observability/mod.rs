//! Observability module for the extension service.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
