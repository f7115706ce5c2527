//! Common utilities shared across the extension service crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, leeway bounds, public key decoding)
pub mod jwt;
