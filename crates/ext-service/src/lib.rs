//! Extension Service Library
//!
//! This library provides the core functionality of the extension server,
//! which serves inter-server APIs to the name server:
//!
//! - Inter-server authentication (RS256 tokens issued by the name server)
//! - Public key acquisition and single-flight caching
//! - Daily asset multiplier updates
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> services/*.rs
//!                        |
//!                 auth/verifier.rs -> auth/key_store.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key store, token verifier and authenticated identity
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication gate
//! - `models` - Request and response bodies
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Asset multiplier service
//! - `tasks` - Background key refresh

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod tasks;
