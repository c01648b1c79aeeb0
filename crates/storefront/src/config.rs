//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_API_BASE_URL` - Base URL of the shop API (default: `http://localhost:8081/api`)
//! - `SHOPFRONT_SESSION_DIR` - Directory holding the persisted session (default: `.shopfront`)
//! - `SHOPFRONT_HTTP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `SHOPFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081/api";
pub const DEFAULT_SESSION_DIR: &str = ".shopfront";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Shop API connection settings.
    pub api: ApiConfig,
    /// Directory the CLI persists the session into.
    pub session_dir: PathBuf,
    /// Sentry DSN for error tracking (optional).
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (optional).
    pub sentry_environment: Option<String>,
}

/// Shop API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long catalog reads stay cached.
    pub catalog_cache_ttl: Duration,
}

impl ApiConfig {
    /// Settings for `base_url` with default timeout and cache lifetime.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let base_url_raw = env.get_or_default("SHOPFRONT_API_BASE_URL", DEFAULT_API_BASE_URL);
        let base_url = parse_base_url(&base_url_raw)?;

        let timeout = env.get_secs("SHOPFRONT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_HTTP_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let catalog_cache_ttl = env.get_secs(
            "SHOPFRONT_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                timeout,
                catalog_cache_ttl,
            },
            session_dir: PathBuf::from(env.get_or_default("SHOPFRONT_SESSION_DIR", DEFAULT_SESSION_DIR)),
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Variable lookup with the usual accessors. Empty values count as unset.
struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional environment variable.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a whole number of seconds.
    fn get_secs(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        let secs = match self.get_optional(key) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?,
            None => default,
        };
        Ok(Duration::from_secs(secs))
    }
}

/// Parse and check the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("SHOPFRONT_API_BASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPFRONT_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8081/api");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.api.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.session_dir, PathBuf::from(".shopfront"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SHOPFRONT_API_BASE_URL", "https://shop.example.com/api"),
            ("SHOPFRONT_HTTP_TIMEOUT_SECS", "5"),
            ("SHOPFRONT_CATALOG_CACHE_TTL_SECS", "0"),
            ("SHOPFRONT_SESSION_DIR", "/tmp/session"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ])
        .unwrap();
        assert_eq!(config.api.base_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert!(config.api.catalog_cache_ttl.is_zero());
        assert_eq!(config.session_dir, PathBuf::from("/tmp/session"));
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("SHOPFRONT_API_BASE_URL", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), DEFAULT_API_BASE_URL);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("SHOPFRONT_API_BASE_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            load(&[("SHOPFRONT_API_BASE_URL", "ftp://example.com")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            load(&[("SHOPFRONT_HTTP_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            load(&[("SHOPFRONT_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }
}
