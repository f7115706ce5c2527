//! # Extension Service Test Utilities
//!
//! Shared test utilities for the extension service.
//!
//! This crate provides:
//! - RSA crypto fixtures (a trusted and an untrusted key pair)
//! - Token builders (`TestTokenBuilder` for signed inter-server tokens)
//! - Server test harness (`TestKeyServer` mock key endpoint, `TestExtServer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ext_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key_server = TestKeyServer::start().await;
//!     let server = TestExtServer::spawn(&key_server).await?;
//!
//!     let token = TestTokenBuilder::new().build();
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/msa/ext/api/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
