//! Background tasks for the extension service.
//!
//! # Tasks
//!
//! - `key_refresh` - Periodically re-fetches the inter-server public key

pub mod key_refresh;

pub use key_refresh::start_key_refresh;
