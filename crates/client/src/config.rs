//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `GAVEL_API_URL` - Marketplace API base URL (default: `http://localhost:3000/api`)
//! - `GAVEL_STATE_DIR` - Directory for persisted session/cart state (default: `.gavel`)
//! - `GAVEL_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `GAVEL_CHECKOUT_DELAY_MS` - Simulated payment round trip (default: 2000)
//! - `GAVEL_CACHE_TTL_SECS` - Category cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::api::DEFAULT_CACHE_TTL;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_STATE_DIR: &str = ".gavel";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHECKOUT_DELAY_MS: u64 = 2000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace REST API
    pub api_url: Url,
    /// Directory holding persisted client state
    pub state_dir: PathBuf,
    /// Timeout applied to every API request
    pub request_timeout: Duration,
    /// Delay of the simulated payment collaborator
    pub checkout_delay: Duration,
    /// Lifetime of cached category listings
    pub cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_env("GAVEL_API_URL", DEFAULT_API_URL)?;
        validate_api_url(&api_url)?;

        Ok(Self {
            api_url,
            state_dir: PathBuf::from(get_env_or_default("GAVEL_STATE_DIR", DEFAULT_STATE_DIR)),
            request_timeout: Duration::from_secs(parse_env(
                "GAVEL_REQUEST_TIMEOUT_SECS",
                &DEFAULT_TIMEOUT_SECS.to_string(),
            )?),
            checkout_delay: Duration::from_millis(parse_env(
                "GAVEL_CHECKOUT_DELAY_MS",
                &DEFAULT_CHECKOUT_DELAY_MS.to_string(),
            )?),
            cache_ttl: Duration::from_secs(parse_env(
                "GAVEL_CACHE_TTL_SECS",
                &DEFAULT_CACHE_TTL.as_secs().to_string(),
            )?),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Defaults pointed at `api_url`, for embedding and tests.
    #[must_use]
    pub fn for_api(api_url: Url) -> Self {
        Self {
            api_url,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            checkout_delay: Duration::from_millis(DEFAULT_CHECKOUT_DELAY_MS),
            cache_ttl: DEFAULT_CACHE_TTL,
            sentry_dsn: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// The API must be reached over HTTP(S).
fn validate_api_url(url: &Url) -> Result<(), ConfigError> {
    if matches!(url.scheme(), "http" | "https") && url.has_host() {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "GAVEL_API_URL".to_string(),
            format!("expected an http(s) URL, got {url}"),
        ))
    }
}
