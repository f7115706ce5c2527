//! Extension service configuration.
//!
//! Configuration is loaded from environment variables. Values that shape the
//! trust boundary (key URL, issuer, client id) have no defaults and must be
//! supplied explicitly.

use chrono::{FixedOffset, Offset, Utc};
use common::jwt::{DEFAULT_LEEWAY, MAX_LEEWAY};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default path prefix guarded by inter-server authentication.
pub const DEFAULT_PROTECTED_PATH_PREFIX: &str = "/msa/ext/api";

/// Default connect timeout for the public key fetch.
pub const DEFAULT_KEY_FETCH_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Default total timeout for the public key fetch.
pub const DEFAULT_KEY_FETCH_TIMEOUT_MS: u64 = 3000;

/// Upper bound for either key fetch timeout.
pub const MAX_KEY_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Upper bound for the background key refresh interval (one day).
pub const MAX_KEY_REFRESH_INTERVAL_SECONDS: u64 = 86_400;

/// Default daily volatility (sigma) of the asset multiplier.
pub const DEFAULT_ASSET_VOLATILITY_SIGMA: f64 = 0.02;

/// Default lower clamp of the daily change, in percent.
pub const DEFAULT_ASSET_CLAMP_MIN_PERCENT: f64 = -5.0;

/// Default upper clamp of the daily change, in percent.
pub const DEFAULT_ASSET_CLAMP_MAX_PERCENT: f64 = 5.0;

/// Default offset used to determine the calendar day (UTC+9).
pub const DEFAULT_ASSET_UTC_OFFSET_SECONDS: i32 = 9 * 3600;

/// Default capacity of the daily multiplier cache.
pub const DEFAULT_ASSET_CACHE_MAX_ENTRIES: u64 = 300_000;

/// Default lifetime of a cached multiplier, in days.
pub const DEFAULT_ASSET_CACHE_TTL_DAYS: u64 = 1;

/// Extension service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the name server endpoint that serves the RSA public key.
    pub public_key_url: String,

    /// Expected `iss` claim of inter-server tokens.
    pub jwt_issuer: String,

    /// Expected `sub` claim. `None` disables the client check.
    pub expected_client_id: Option<String>,

    /// Leeway applied to `exp` validation.
    pub jwt_leeway_seconds: u64,

    /// Connect timeout for the key fetch.
    pub key_fetch_connect_timeout: Duration,

    /// Total request timeout for the key fetch.
    pub key_fetch_timeout: Duration,

    /// Interval of the background key refresh. `None` disables it.
    pub key_refresh_interval: Option<Duration>,

    /// Path prefix whose routes require inter-server authentication.
    pub protected_path_prefix: String,

    /// Asset multiplier settings.
    pub asset: AssetConfig,
}

/// Settings for the daily asset multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    /// Standard deviation of the log-normal daily multiplier.
    pub volatility_sigma: f64,

    /// Lower clamp of the daily change, in percent.
    pub clamp_min_percent: f64,

    /// Upper clamp of the daily change, in percent.
    pub clamp_max_percent: f64,

    /// Offset used to derive the calendar day for the cache key.
    pub utc_offset: FixedOffset,

    /// Maximum number of cached (user, day) multipliers.
    pub cache_max_entries: u64,

    /// Lifetime of a cached multiplier.
    pub cache_ttl: Duration,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            volatility_sigma: DEFAULT_ASSET_VOLATILITY_SIGMA,
            clamp_min_percent: DEFAULT_ASSET_CLAMP_MIN_PERCENT,
            clamp_max_percent: DEFAULT_ASSET_CLAMP_MAX_PERCENT,
            utc_offset: FixedOffset::east_opt(DEFAULT_ASSET_UTC_OFFSET_SECONDS)
                .unwrap_or_else(|| Utc.fix()),
            cache_max_entries: DEFAULT_ASSET_CACHE_MAX_ENTRIES,
            cache_ttl: days(DEFAULT_ASSET_CACHE_TTL_DAYS),
        }
    }
}

/// Custom Debug implementation that keeps the client id out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("public_key_url", &self.public_key_url)
            .field("jwt_issuer", &self.jwt_issuer)
            .field(
                "expected_client_id",
                &self.expected_client_id.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("key_fetch_connect_timeout", &self.key_fetch_connect_timeout)
            .field("key_fetch_timeout", &self.key_fetch_timeout)
            .field("key_refresh_interval", &self.key_refresh_interval)
            .field("protected_path_prefix", &self.protected_path_prefix)
            .field("asset", &self.asset)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid public key URL configuration: {0}")]
    InvalidPublicKeyUrl(String),

    #[error("Invalid JWT configuration: {0}")]
    InvalidJwt(String),

    #[error("Invalid key fetch configuration: {0}")]
    InvalidKeyFetch(String),

    #[error("Invalid path prefix configuration: {0}")]
    InvalidPathPrefix(String),

    #[error("Invalid asset configuration: {0}")]
    InvalidAsset(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let public_key_url = vars
            .get("INTER_SERVER_PUBLIC_KEY_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("INTER_SERVER_PUBLIC_KEY_URL".to_string()))?
            .trim()
            .to_string();

        let require_https = parse_bool(vars, "KEY_URL_REQUIRE_HTTPS", false)
            .map_err(ConfigError::InvalidPublicKeyUrl)?;

        if require_https {
            if !public_key_url.starts_with("https://") {
                return Err(ConfigError::InvalidPublicKeyUrl(
                    "INTER_SERVER_PUBLIC_KEY_URL must use https when KEY_URL_REQUIRE_HTTPS=true"
                        .to_string(),
                ));
            }
        } else if !public_key_url.starts_with("https://") && !public_key_url.starts_with("http://")
        {
            return Err(ConfigError::InvalidPublicKeyUrl(format!(
                "INTER_SERVER_PUBLIC_KEY_URL must be an http(s) URL, got '{}'",
                public_key_url
            )));
        }

        let jwt_issuer = vars
            .get("INTER_SERVER_JWT_ISSUER")
            .ok_or_else(|| ConfigError::MissingEnvVar("INTER_SERVER_JWT_ISSUER".to_string()))?
            .trim()
            .to_string();

        if jwt_issuer.is_empty() {
            return Err(ConfigError::InvalidJwt(
                "INTER_SERVER_JWT_ISSUER must not be empty".to_string(),
            ));
        }

        let client_check_enabled = parse_bool(vars, "INTER_SERVER_CLIENT_CHECK_ENABLED", true)
            .map_err(ConfigError::InvalidJwt)?;

        let expected_client_id = if client_check_enabled {
            let client_id = vars
                .get("INTER_SERVER_CLIENT_ID")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("INTER_SERVER_CLIENT_ID".to_string()))?;
            Some(client_id)
        } else {
            None
        };

        // Parse JWT leeway with validation
        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwt(format!(
                    "JWT_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_LEEWAY.as_secs() {
                return Err(ConfigError::InvalidJwt(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_LEEWAY.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_LEEWAY.as_secs()
        };

        let key_fetch_connect_timeout = parse_timeout_ms(
            vars,
            "KEY_FETCH_CONNECT_TIMEOUT_MS",
            DEFAULT_KEY_FETCH_CONNECT_TIMEOUT_MS,
        )?;
        let key_fetch_timeout =
            parse_timeout_ms(vars, "KEY_FETCH_TIMEOUT_MS", DEFAULT_KEY_FETCH_TIMEOUT_MS)?;

        let key_refresh_interval = if let Some(value_str) = vars.get("KEY_REFRESH_INTERVAL_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidKeyFetch(format!(
                    "KEY_REFRESH_INTERVAL_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_KEY_REFRESH_INTERVAL_SECONDS {
                return Err(ConfigError::InvalidKeyFetch(format!(
                    "KEY_REFRESH_INTERVAL_SECONDS must not exceed {} seconds, got {}",
                    MAX_KEY_REFRESH_INTERVAL_SECONDS, value
                )));
            }

            (value > 0).then(|| Duration::from_secs(value))
        } else {
            None
        };

        let protected_path_prefix = parse_path_prefix(vars)?;

        let asset = parse_asset_config(vars)?;

        Ok(Config {
            bind_address,
            public_key_url,
            jwt_issuer,
            expected_client_id,
            jwt_leeway_seconds,
            key_fetch_connect_timeout,
            key_fetch_timeout,
            key_refresh_interval,
            protected_path_prefix,
            asset,
        })
    }
}

fn days(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(24 * 60 * 60))
}

fn parse_bool(vars: &HashMap<String, String>, name: &str, default: bool) -> Result<bool, String> {
    match vars.get(name).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(format!("{} must be true or false, got '{}'", name, v)),
    }
}

fn parse_timeout_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_millis(default_ms));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidKeyFetch(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidKeyFetch(format!(
            "{} must be greater than 0",
            name
        )));
    }

    if value > MAX_KEY_FETCH_TIMEOUT_MS {
        return Err(ConfigError::InvalidKeyFetch(format!(
            "{} must not exceed {} ms, got {}",
            name, MAX_KEY_FETCH_TIMEOUT_MS, value
        )));
    }

    Ok(Duration::from_millis(value))
}

fn parse_path_prefix(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    let raw = vars
        .get("PROTECTED_PATH_PREFIX")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_PROTECTED_PATH_PREFIX.to_string());

    if !raw.starts_with('/') {
        return Err(ConfigError::InvalidPathPrefix(format!(
            "PROTECTED_PATH_PREFIX must start with '/', got '{}'",
            raw
        )));
    }

    let prefix = raw.trim_end_matches('/').to_string();
    if prefix.is_empty() {
        // Guarding "/" would swallow the health endpoints.
        return Err(ConfigError::InvalidPathPrefix(
            "PROTECTED_PATH_PREFIX must not be the root path".to_string(),
        ));
    }

    Ok(prefix)
}

fn parse_f64(vars: &HashMap<String, String>, name: &str, default: f64) -> Result<f64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: f64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidAsset(format!(
            "{} must be a number, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if !value.is_finite() {
        return Err(ConfigError::InvalidAsset(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }

    Ok(value)
}

fn parse_positive_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidAsset(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidAsset(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}

fn parse_asset_config(vars: &HashMap<String, String>) -> Result<AssetConfig, ConfigError> {
    let volatility_sigma = parse_f64(
        vars,
        "ASSET_VOLATILITY_SIGMA",
        DEFAULT_ASSET_VOLATILITY_SIGMA,
    )?;
    if volatility_sigma < 0.0 {
        return Err(ConfigError::InvalidAsset(format!(
            "ASSET_VOLATILITY_SIGMA must be >= 0, got {}",
            volatility_sigma
        )));
    }

    let clamp_min_percent = parse_f64(
        vars,
        "ASSET_CLAMP_MIN_PERCENT",
        DEFAULT_ASSET_CLAMP_MIN_PERCENT,
    )?;
    let clamp_max_percent = parse_f64(
        vars,
        "ASSET_CLAMP_MAX_PERCENT",
        DEFAULT_ASSET_CLAMP_MAX_PERCENT,
    )?;
    if clamp_min_percent > clamp_max_percent {
        return Err(ConfigError::InvalidAsset(format!(
            "ASSET_CLAMP_MIN_PERCENT ({}) must be <= ASSET_CLAMP_MAX_PERCENT ({})",
            clamp_min_percent, clamp_max_percent
        )));
    }
    if clamp_min_percent <= -100.0 {
        return Err(ConfigError::InvalidAsset(format!(
            "ASSET_CLAMP_MIN_PERCENT must be greater than -100, got {}",
            clamp_min_percent
        )));
    }

    let utc_offset = match vars.get("ASSET_UTC_OFFSET_SECONDS") {
        None => FixedOffset::east_opt(DEFAULT_ASSET_UTC_OFFSET_SECONDS),
        Some(value_str) => {
            let secs: i32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidAsset(format!(
                    "ASSET_UTC_OFFSET_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;
            FixedOffset::east_opt(secs)
        }
    }
    .ok_or_else(|| {
        ConfigError::InvalidAsset("ASSET_UTC_OFFSET_SECONDS must be within ±24h".to_string())
    })?;

    let cache_max_entries = parse_positive_u64(
        vars,
        "ASSET_CACHE_MAX_ENTRIES",
        DEFAULT_ASSET_CACHE_MAX_ENTRIES,
    )?;
    let cache_ttl_days =
        parse_positive_u64(vars, "ASSET_CACHE_TTL_DAYS", DEFAULT_ASSET_CACHE_TTL_DAYS)?;

    Ok(AssetConfig {
        volatility_sigma,
        clamp_min_percent,
        clamp_max_percent,
        utc_offset,
        cache_max_entries,
        cache_ttl: days(cache_ttl_days),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "INTER_SERVER_PUBLIC_KEY_URL".to_string(),
                "http://name-server:8081/msa/name/api/public-key".to_string(),
            ),
            (
                "INTER_SERVER_JWT_ISSUER".to_string(),
                "dg-name-server".to_string(),
            ),
            (
                "INTER_SERVER_CLIENT_ID".to_string(),
                "ext-client-01".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.public_key_url,
            "http://name-server:8081/msa/name/api/public-key"
        );
        assert_eq!(config.jwt_issuer, "dg-name-server");
        assert_eq!(config.expected_client_id.as_deref(), Some("ext-client-01"));
        assert_eq!(config.jwt_leeway_seconds, 0);
        assert_eq!(config.key_fetch_connect_timeout, Duration::from_secs(3));
        assert_eq!(config.key_fetch_timeout, Duration::from_secs(3));
        assert!(config.key_refresh_interval.is_none());
        assert_eq!(config.protected_path_prefix, DEFAULT_PROTECTED_PATH_PREFIX);
        assert_eq!(config.asset, AssetConfig::default());
        assert_eq!(config.asset.utc_offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "30".to_string());
        vars.insert("KEY_FETCH_CONNECT_TIMEOUT_MS".to_string(), "500".to_string());
        vars.insert("KEY_FETCH_TIMEOUT_MS".to_string(), "1500".to_string());
        vars.insert("KEY_REFRESH_INTERVAL_SECONDS".to_string(), "3600".to_string());
        vars.insert("PROTECTED_PATH_PREFIX".to_string(), "/internal/".to_string());
        vars.insert("ASSET_VOLATILITY_SIGMA".to_string(), "0.05".to_string());
        vars.insert("ASSET_CLAMP_MIN_PERCENT".to_string(), "-2.5".to_string());
        vars.insert("ASSET_CLAMP_MAX_PERCENT".to_string(), "2.5".to_string());
        vars.insert("ASSET_UTC_OFFSET_SECONDS".to_string(), "0".to_string());
        vars.insert("ASSET_CACHE_MAX_ENTRIES".to_string(), "10".to_string());
        vars.insert("ASSET_CACHE_TTL_DAYS".to_string(), "2".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwt_leeway_seconds, 30);
        assert_eq!(config.key_fetch_connect_timeout, Duration::from_millis(500));
        assert_eq!(config.key_fetch_timeout, Duration::from_millis(1500));
        assert_eq!(
            config.key_refresh_interval,
            Some(Duration::from_secs(3600))
        );
        assert_eq!(config.protected_path_prefix, "/internal");
        assert_eq!(config.asset.volatility_sigma, 0.05);
        assert_eq!(config.asset.clamp_min_percent, -2.5);
        assert_eq!(config.asset.clamp_max_percent, 2.5);
        assert_eq!(config.asset.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.asset.cache_max_entries, 10);
        assert_eq!(config.asset.cache_ttl, Duration::from_secs(2 * 86_400));
    }

    #[test]
    fn test_from_vars_missing_public_key_url() {
        let mut vars = base_vars();
        vars.remove("INTER_SERVER_PUBLIC_KEY_URL");

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "INTER_SERVER_PUBLIC_KEY_URL")
        );
    }

    #[test]
    fn test_from_vars_missing_issuer() {
        let mut vars = base_vars();
        vars.remove("INTER_SERVER_JWT_ISSUER");

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "INTER_SERVER_JWT_ISSUER")
        );
    }

    #[test]
    fn test_empty_issuer_rejected() {
        let mut vars = base_vars();
        vars.insert("INTER_SERVER_JWT_ISSUER".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidJwt(msg)) if msg.contains("must not be empty")));
    }

    #[test]
    fn test_client_id_required_when_check_enabled() {
        let mut vars = base_vars();
        vars.remove("INTER_SERVER_CLIENT_ID");

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "INTER_SERVER_CLIENT_ID")
        );
    }

    #[test]
    fn test_client_check_can_be_disabled() {
        let mut vars = base_vars();
        vars.remove("INTER_SERVER_CLIENT_ID");
        vars.insert(
            "INTER_SERVER_CLIENT_CHECK_ENABLED".to_string(),
            "false".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert!(config.expected_client_id.is_none());
    }

    #[test]
    fn test_disabled_client_check_ignores_configured_id() {
        let mut vars = base_vars();
        vars.insert(
            "INTER_SERVER_CLIENT_CHECK_ENABLED".to_string(),
            "0".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert!(config.expected_client_id.is_none());
    }

    #[test]
    fn test_client_check_flag_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert(
            "INTER_SERVER_CLIENT_CHECK_ENABLED".to_string(),
            "maybe".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidJwt(msg)) if msg.contains("true or false")));
    }

    #[test]
    fn test_public_key_url_requires_http_scheme() {
        let mut vars = base_vars();
        vars.insert(
            "INTER_SERVER_PUBLIC_KEY_URL".to_string(),
            "ftp://name-server/key".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidPublicKeyUrl(_))));
    }

    #[test]
    fn test_require_https_rejects_plain_http() {
        let mut vars = base_vars();
        vars.insert("KEY_URL_REQUIRE_HTTPS".to_string(), "true".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidPublicKeyUrl(msg)) if msg.contains("must use https"))
        );
    }

    #[test]
    fn test_require_https_accepts_https() {
        let mut vars = base_vars();
        vars.insert("KEY_URL_REQUIRE_HTTPS".to_string(), "true".to_string());
        vars.insert(
            "INTER_SERVER_PUBLIC_KEY_URL".to_string(),
            "https://name-server/msa/name/api/public-key".to_string(),
        );

        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_jwt_leeway_accepts_max() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.jwt_leeway_seconds, 600);
    }

    #[test]
    fn test_jwt_leeway_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwt(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_jwt_leeway_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "-5".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwt(msg)) if msg.contains("must be a valid non-negative integer"))
        );
    }

    #[test]
    fn test_key_fetch_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("KEY_FETCH_TIMEOUT_MS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidKeyFetch(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_key_fetch_timeout_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert(
            "KEY_FETCH_CONNECT_TIMEOUT_MS".to_string(),
            "30001".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidKeyFetch(msg)) if msg.contains("must not exceed"))
        );
    }

    #[test]
    fn test_key_refresh_interval_zero_disables() {
        let mut vars = base_vars();
        vars.insert("KEY_REFRESH_INTERVAL_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert!(config.key_refresh_interval.is_none());
    }

    #[test]
    fn test_key_refresh_interval_accepts_max() {
        let mut vars = base_vars();
        vars.insert("KEY_REFRESH_INTERVAL_SECONDS".to_string(), "86400".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(
            config.key_refresh_interval,
            Some(Duration::from_secs(MAX_KEY_REFRESH_INTERVAL_SECONDS))
        );
    }

    #[test]
    fn test_key_refresh_interval_rejects_too_large() {
        for value in ["86401", "18446744073709551615"] {
            let mut vars = base_vars();
            vars.insert("KEY_REFRESH_INTERVAL_SECONDS".to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidKeyFetch(ref msg)) if msg.contains("must not exceed 86400")),
                "Expected InvalidKeyFetch for {}, got {:?}",
                value,
                result.map(|c| c.key_refresh_interval)
            );
        }
    }

    #[test]
    fn test_path_prefix_must_start_with_slash() {
        let mut vars = base_vars();
        vars.insert("PROTECTED_PATH_PREFIX".to_string(), "msa/ext".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidPathPrefix(_))));
    }

    #[test]
    fn test_path_prefix_rejects_root() {
        let mut vars = base_vars();
        vars.insert("PROTECTED_PATH_PREFIX".to_string(), "/".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidPathPrefix(msg)) if msg.contains("root"))
        );
    }

    #[test]
    fn test_asset_sigma_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("ASSET_VOLATILITY_SIGMA".to_string(), "-0.1".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAsset(msg)) if msg.contains(">= 0")));
    }

    #[test]
    fn test_asset_sigma_rejects_nan() {
        let mut vars = base_vars();
        vars.insert("ASSET_VOLATILITY_SIGMA".to_string(), "NaN".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAsset(msg)) if msg.contains("finite")));
    }

    #[test]
    fn test_asset_clamp_min_above_max_rejected() {
        let mut vars = base_vars();
        vars.insert("ASSET_CLAMP_MIN_PERCENT".to_string(), "3".to_string());
        vars.insert("ASSET_CLAMP_MAX_PERCENT".to_string(), "1".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAsset(msg)) if msg.contains("must be <=")));
    }

    #[test]
    fn test_asset_utc_offset_out_of_range() {
        let mut vars = base_vars();
        vars.insert(
            "ASSET_UTC_OFFSET_SECONDS".to_string(),
            "90000".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAsset(_))));
    }

    #[test]
    fn test_asset_cache_entries_reject_zero() {
        let mut vars = base_vars();
        vars.insert("ASSET_CACHE_MAX_ENTRIES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidAsset(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_debug_redacts_client_id() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("ext-client-01"));
    }
}
