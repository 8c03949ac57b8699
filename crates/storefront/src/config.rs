//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)
//!
//! ## Shared store and cache
//! - `REDIS_URL` (or `REDIS_URI`) - Shared store; in-process store when unset
//! - `SEARCH_CACHE_TTL_SECS` - Result cache lifetime (default: 60)
//!
//! ## Best Buy
//! - `BESTBUY_API_KEY` - API key
//! - `BESTBUY_BASE_URL` - API root (default: <https://api.bestbuy.com/v1>)
//! - `BESTBUY_RATE_LIMIT_PER_SEC` - Outbound calls per second (default: 5)
//! - `BESTBUY_STORE_RADIUS_MILES` - Store search radius (default: 5)
//!
//! ## Walmart
//! - `WALMART_CONSUMER_ID` - Consumer ID
//! - `WALMART_PRIVATE_KEY` - Inline PEM, or bare base64 PKCS#8 DER
//! - `WALMART_PRIVATE_KEY_PATH` - Path to a PEM file (takes precedence)
//! - `WALMART_KEY_VERSION` - Key version (default: 1)
//! - `WALMART_INTIMESTAMP` - Pin the signed timestamp (debugging)
//! - `WALMART_BASE_URL` - Affiliate API root
//! - `WALMART_RATE_LIMIT_PER_SEC` - Outbound calls per second (default: 5)
//!
//! Retailer credentials are optional here. A retailer with missing
//! credentials fails its own searches with a configuration error; the
//! service still starts.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Default Best Buy API root.
pub const BESTBUY_DEFAULT_BASE_URL: &str = "https://api.bestbuy.com/v1";

/// Default Walmart affiliate API root.
pub const WALMART_DEFAULT_BASE_URL: &str =
    "https://developer.api.walmart.com/api-proxy/service/affil";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared store URL (may contain a password)
    pub redis_url: Option<SecretString>,
    /// Result cache lifetime
    pub cache_ttl: Duration,
    pub bestbuy: BestBuyConfig,
    pub walmart: WalmartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Best Buy API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BestBuyConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Outbound calls per second, shared across instances
    pub rate_limit_per_sec: u32,
    /// Radius for the store availability lookup
    pub store_radius_miles: u32,
}

impl std::fmt::Debug for BestBuyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestBuyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .field("store_radius_miles", &self.store_radius_miles)
            .finish()
    }
}

impl Default for BestBuyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: BESTBUY_DEFAULT_BASE_URL.to_string(),
            rate_limit_per_sec: 5,
            store_radius_miles: 5,
        }
    }
}

/// Walmart affiliate API configuration.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct WalmartConfig {
    pub consumer_id: Option<String>,
    /// Inline key material
    pub private_key: Option<SecretString>,
    /// Key file, preferred over the inline value
    pub private_key_path: Option<PathBuf>,
    pub key_version: String,
    /// Fixed `WM_CONSUMER.INTIMESTAMP` value
    pub fixed_timestamp: Option<String>,
    pub base_url: String,
    /// Outbound calls per second, shared across instances
    pub rate_limit_per_sec: u32,
}

impl std::fmt::Debug for WalmartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalmartConfig")
            .field("consumer_id", &self.consumer_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("private_key_path", &self.private_key_path)
            .field("key_version", &self.key_version)
            .field("fixed_timestamp", &self.fixed_timestamp)
            .field("base_url", &self.base_url)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .finish()
    }
}

impl Default for WalmartConfig {
    fn default() -> Self {
        Self {
            consumer_id: None,
            private_key: None,
            private_key_path: None,
            key_version: "1".to_string(),
            fixed_timestamp: None,
            base_url: WALMART_DEFAULT_BASE_URL.to_string(),
            rate_limit_per_sec: 5,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_or_default::<IpAddr, _>(&get, "STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_or_default::<u16, _>(&get, "STOREFRONT_PORT", "3000")?;

        // Fall back to REDIS_URI, the name some hosts inject
        let redis_url = get_optional(&get, "REDIS_URL")
            .or_else(|| get_optional(&get, "REDIS_URI"))
            .map(SecretString::from);

        let cache_ttl_secs = parse_or_default::<u64, _>(&get, "SEARCH_CACHE_TTL_SECS", "60")?;

        Ok(Self {
            host,
            port,
            redis_url,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            bestbuy: BestBuyConfig::from_lookup(&get)?,
            walmart: WalmartConfig::from_lookup(&get)?,
            sentry_dsn: get_optional(&get, "SENTRY_DSN"),
            sentry_environment: get_optional(&get, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_or_default::<f32, _>(&get, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_or_default::<f32, _>(
                &get,
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.1",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            redis_url: None,
            cache_ttl: Duration::from_secs(60),
            bestbuy: BestBuyConfig::default(),
            walmart: WalmartConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }
}

impl BestBuyConfig {
    fn from_lookup<F>(get: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: get_optional(get, "BESTBUY_API_KEY").map(SecretString::from),
            base_url: get_or_default(get, "BESTBUY_BASE_URL", BESTBUY_DEFAULT_BASE_URL),
            rate_limit_per_sec: parse_rate_limit(get, "BESTBUY_RATE_LIMIT_PER_SEC")?,
            store_radius_miles: parse_or_default::<u32, _>(get, "BESTBUY_STORE_RADIUS_MILES", "5")?,
        })
    }
}

impl WalmartConfig {
    fn from_lookup<F>(get: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            consumer_id: get_optional(get, "WALMART_CONSUMER_ID"),
            private_key: get_optional(get, "WALMART_PRIVATE_KEY").map(SecretString::from),
            private_key_path: get_optional(get, "WALMART_PRIVATE_KEY_PATH").map(PathBuf::from),
            key_version: get_or_default(get, "WALMART_KEY_VERSION", "1"),
            fixed_timestamp: get_optional(get, "WALMART_INTIMESTAMP"),
            base_url: get_or_default(get, "WALMART_BASE_URL", WALMART_DEFAULT_BASE_URL),
            rate_limit_per_sec: parse_rate_limit(get, "WALMART_RATE_LIMIT_PER_SEC")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Per-second outbound limit, default 5. Zero would block every call.
fn parse_rate_limit<F>(get: &F, key: &str) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let limit = parse_or_default::<u32, _>(get, key, "5")?;
    if limit == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(limit)
}

/// Get an optional variable, treating blank values as unset.
fn get_optional<F>(get: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get a variable with a default value.
fn get_or_default<F>(get: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional(get, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or_default<T, F>(get: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    get_or_default(get, key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
