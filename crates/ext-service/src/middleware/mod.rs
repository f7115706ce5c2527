//! Middleware for the extension service.
//!
//! # Components
//!
//! - `auth` - Inter-server authentication gate for protected routes

pub mod auth;

pub use auth::{require_inter_server_auth, AuthState};
