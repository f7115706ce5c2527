//! Public key store for inter-server token verification.
//!
//! Fetches the name server's RSA public key from its key distribution
//! endpoint and caches it for the lifetime of the process.
//!
//! # Concurrency
//!
//! - Reads of a cached key are lock-free (`ArcSwapOption`)
//! - A cached key is replaced wholesale, never mutated in place
//! - Fetches are single-flight: callers that miss the cache while a fetch is
//!   in progress wait for it and share its outcome
//!
//! # Security
//!
//! - Fetches are bounded by connect and total timeouts
//! - Only RSA keys are accepted
//! - A failed fetch never evicts a previously cached key

use crate::observability::metrics;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::jwt::{decode_rsa_public_key, PublicKeyDecodeError, MAX_PUBLIC_KEY_BODY_BYTES};
use jsonwebtoken::DecodingKey;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

/// Verification key plus fetch metadata.
pub struct CachedPublicKey {
    decoding_key: DecodingKey,
    fetched_at: DateTime<Utc>,
    source: String,
}

impl CachedPublicKey {
    /// Build a cached key from PKCS#1 DER RSA key material.
    pub fn from_pkcs1_der(pkcs1_der: &[u8], source: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_rsa_der(pkcs1_der),
            fetched_at: Utc::now(),
            source: source.into(),
        }
    }

    /// Key material for signature verification.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// When the key was fetched.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Endpoint the key was fetched from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for CachedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedPublicKey")
            .field("fetched_at", &self.fetched_at)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Key store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    #[error("key endpoint request failed: {0}")]
    Transport(String),

    #[error("key endpoint returned HTTP {0}")]
    Status(u16),

    #[error("key endpoint response exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("key payload could not be decoded: {0}")]
    Decode(String),

    #[error("key endpoint served a non-RSA key (algorithm {0})")]
    NotRsa(String),

    #[error("no verification key available")]
    Unavailable,
}

impl KeyStoreError {
    /// Bounded label for metrics.
    pub fn status_label(&self) -> &'static str {
        match self {
            KeyStoreError::Transport(_) => "transport",
            KeyStoreError::Status(_) => "status",
            KeyStoreError::BodyTooLarge(_) => "body_too_large",
            KeyStoreError::Decode(_) => "decode",
            KeyStoreError::NotRsa(_) => "not_rsa",
            KeyStoreError::Unavailable => "unavailable",
        }
    }
}

impl From<PublicKeyDecodeError> for KeyStoreError {
    fn from(err: PublicKeyDecodeError) -> Self {
        match err {
            PublicKeyDecodeError::NotRsa(oid) => KeyStoreError::NotRsa(oid),
            other => KeyStoreError::Decode(other.to_string()),
        }
    }
}

/// Source of the verification key used by the token verifier.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Current verification key.
    ///
    /// # Errors
    ///
    /// Returns `KeyStoreError::Unavailable` when no key is cached and the
    /// fetch triggered by this call failed.
    async fn get_key(&self) -> Result<Arc<CachedPublicKey>, KeyStoreError>;
}

/// Caching, single-flight client for the name server's public key.
pub struct PublicKeyStore {
    /// URL of the key distribution endpoint.
    key_url: String,

    /// HTTP client with connect/total timeouts applied.
    http_client: reqwest::Client,

    /// Published key, replaced wholesale.
    cached: ArcSwapOption<CachedPublicKey>,

    /// Serializes fetch-and-publish. Holds the error of the last fetch, if
    /// it failed.
    fetch_gate: Mutex<Option<KeyStoreError>>,

    /// Incremented after every completed fetch.
    fetch_generation: AtomicU64,
}

impl PublicKeyStore {
    /// Create a key store. No fetch is performed until `initialize`,
    /// `get_key` or `refresh` is called.
    ///
    /// # Errors
    ///
    /// Returns `KeyStoreError::Transport` if the HTTP client cannot be built.
    pub fn new(
        key_url: String,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, KeyStoreError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| KeyStoreError::Transport(format!("failed to build HTTP client: {e}")))?;

        if key_url.starts_with("http://") {
            tracing::warn!(
                target: "ext.auth.key_store",
                url = %key_url,
                "Public key URL uses plain HTTP; key material has no transport integrity"
            );
        }

        Ok(Self {
            key_url,
            http_client,
            cached: ArcSwapOption::empty(),
            fetch_gate: Mutex::new(None),
            fetch_generation: AtomicU64::new(0),
        })
    }

    /// Eager fetch at process start.
    ///
    /// Failure is logged and non-fatal: the cache stays empty and the next
    /// `get_key` retries.
    #[instrument(skip(self), fields(url = %self.key_url))]
    pub async fn initialize(&self) {
        match self.refresh().await {
            Ok(key) => {
                tracing::info!(
                    target: "ext.auth.key_store",
                    fetched_at = %key.fetched_at(),
                    "Inter-server public key loaded at startup"
                );
            }
            Err(e) => {
                tracing::error!(
                    target: "ext.auth.key_store",
                    error = %e,
                    "Initial public key fetch failed; protected routes reject until a fetch succeeds"
                );
            }
        }
    }

    /// Force a fetch through the single-flight path.
    ///
    /// On failure the previously cached key, if any, is kept.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure. Callers that waited on a fetch started by
    /// another caller receive that fetch's outcome.
    #[instrument(skip(self), fields(url = %self.key_url))]
    pub async fn refresh(&self) -> Result<Arc<CachedPublicKey>, KeyStoreError> {
        let observed = self.fetch_generation.load(Ordering::Acquire);
        let mut last_error = self.fetch_gate.lock().await;

        if self.fetch_generation.load(Ordering::Acquire) != observed {
            return match last_error.as_ref() {
                Some(err) => Err(err.clone()),
                None => self.cached.load_full().ok_or(KeyStoreError::Unavailable),
            };
        }

        self.fetch_and_publish(&mut last_error).await
    }

    /// Whether a verification key is cached.
    pub fn is_loaded(&self) -> bool {
        self.cached.load().is_some()
    }

    /// Cached key, without fetching.
    pub fn cached(&self) -> Option<Arc<CachedPublicKey>> {
        self.cached.load_full()
    }

    /// Configured key URL.
    pub fn key_url(&self) -> &str {
        &self.key_url
    }

    /// Fetch, then publish on success. Must be called with the fetch gate held.
    async fn fetch_and_publish(
        &self,
        last_error: &mut Option<KeyStoreError>,
    ) -> Result<Arc<CachedPublicKey>, KeyStoreError> {
        let result = match self.fetch().await {
            Ok(key) => {
                let key = Arc::new(key);
                self.cached.store(Some(Arc::clone(&key)));
                *last_error = None;
                Ok(key)
            }
            Err(e) => {
                *last_error = Some(e.clone());
                Err(e)
            }
        };

        metrics::set_key_loaded(self.is_loaded());
        self.fetch_generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// GET the key endpoint and decode the body into an RSA key.
    async fn fetch(&self) -> Result<CachedPublicKey, KeyStoreError> {
        tracing::debug!(target: "ext.auth.key_store", url = %self.key_url, "Fetching public key");

        let start = Instant::now();
        let result = self.fetch_inner().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => {
                metrics::record_key_fetch("success", elapsed);
                tracing::info!(
                    target: "ext.auth.key_store",
                    url = %self.key_url,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Public key fetched"
                );
            }
            Err(e) => {
                metrics::record_key_fetch(e.status_label(), elapsed);
                tracing::error!(
                    target: "ext.auth.key_store",
                    url = %self.key_url,
                    error = %e,
                    "Public key fetch failed"
                );
            }
        }

        result
    }

    async fn fetch_inner(&self) -> Result<CachedPublicKey, KeyStoreError> {
        let mut response = self
            .http_client
            .get(&self.key_url)
            .send()
            .await
            .map_err(|e| KeyStoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyStoreError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_PUBLIC_KEY_BODY_BYTES as u64 {
                return Err(KeyStoreError::BodyTooLarge(MAX_PUBLIC_KEY_BODY_BYTES));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| KeyStoreError::Transport(e.to_string()))?
        {
            if body.len() + chunk.len() > MAX_PUBLIC_KEY_BODY_BYTES {
                return Err(KeyStoreError::BodyTooLarge(MAX_PUBLIC_KEY_BODY_BYTES));
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8(body)
            .map_err(|e| KeyStoreError::Decode(format!("body is not UTF-8: {e}")))?;

        let pkcs1_der = decode_rsa_public_key(&text)?;

        Ok(CachedPublicKey::from_pkcs1_der(&pkcs1_der, self.key_url.clone()))
    }
}

#[async_trait]
impl KeyProvider for PublicKeyStore {
    #[instrument(skip(self), fields(url = %self.key_url))]
    async fn get_key(&self) -> Result<Arc<CachedPublicKey>, KeyStoreError> {
        if let Some(key) = self.cached.load_full() {
            return Ok(key);
        }

        let observed = self.fetch_generation.load(Ordering::Acquire);
        let mut last_error = self.fetch_gate.lock().await;

        // A fetch completed while we waited for the gate: share its outcome.
        if self.fetch_generation.load(Ordering::Acquire) != observed {
            return self.cached.load_full().ok_or(KeyStoreError::Unavailable);
        }

        if let Some(key) = self.cached.load_full() {
            return Ok(key);
        }

        self.fetch_and_publish(&mut last_error)
            .await
            .map_err(|_| KeyStoreError::Unavailable)
    }
}
