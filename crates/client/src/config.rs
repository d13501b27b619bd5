//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MAYA_API_BASE_URL` - REST API root (default: `https://mayaapi.onrender.com/api`)
//! - `MAYA_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `MAYA_PRODUCT_CACHE_TTL_SECS` - Product snapshot cache TTL (default: 300)
//! - `MAYA_ORDER_PAGE_SIZE` - Order list window size (default: 10)
//! - `MAYA_CHECKOUT_SUCCESS_MARKER` - Return URL marker for approved payments (default: success)
//! - `MAYA_CHECKOUT_CANCEL_MARKER` - Return URL marker for cancelled payments (default: cancel)
//! - `MAYA_USER_ID` - Signed-in user ID for front ends without their own identity store
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://mayaapi.onrender.com/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_ORDER_PAGE_SIZE: usize = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API root, without a trailing slash
    pub base_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// How long product snapshots stay cached
    pub product_cache_ttl: Duration,
    /// Page size of the client-side order window
    pub order_page_size: usize,
    /// Checkout return URL markers
    pub checkout: CheckoutMarkers,
    /// Signed-in user, when supplied through the environment
    pub user_id: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Markers recognized in the payment provider's return URL.
///
/// A marker matches any path segment that contains it, ignoring case. The
/// query string is never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMarkers {
    /// Marker of an approved payment; checked first
    pub success: String,
    /// Marker of a cancelled payment
    pub cancel: String,
}

impl Default for CheckoutMarkers {
    fn default() -> Self {
        Self {
            success: "success".to_string(),
            cancel: "cancel".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(
            "MAYA_API_BASE_URL",
            &get_env_or_default("MAYA_API_BASE_URL", DEFAULT_BASE_URL),
        )?;
        let request_timeout = Duration::from_secs(get_positive(
            "MAYA_REQUEST_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let product_cache_ttl = Duration::from_secs(get_positive(
            "MAYA_PRODUCT_CACHE_TTL_SECS",
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?);
        let order_page_size = usize::try_from(get_positive(
            "MAYA_ORDER_PAGE_SIZE",
            DEFAULT_ORDER_PAGE_SIZE as u64,
        )?)
        .map_err(|e| ConfigError::InvalidEnvVar("MAYA_ORDER_PAGE_SIZE".to_string(), e.to_string()))?;

        let defaults = CheckoutMarkers::default();
        let checkout = CheckoutMarkers {
            success: get_marker("MAYA_CHECKOUT_SUCCESS_MARKER", &defaults.success)?,
            cancel: get_marker("MAYA_CHECKOUT_CANCEL_MARKER", &defaults.cancel)?,
        };

        Ok(Self {
            base_url,
            request_timeout,
            product_cache_ttl,
            order_page_size,
            checkout,
            user_id: get_optional_env("MAYA_USER_ID"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration with defaults and the given API root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is not an http(s) URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            order_page_size: DEFAULT_ORDER_PAGE_SIZE,
            checkout: CheckoutMarkers::default(),
            user_id: None,
            sentry_dsn: None,
        })
    }

    /// Join a relative path onto the API root (`cart/u1` -> `{base}/cart/u1`).
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a positive integer, falling back to `default` when unset.
fn get_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_positive(key, &raw)
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Get a checkout marker; markers must be a single non-empty path fragment.
fn get_marker(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    validate_marker(key, &value)?;
    Ok(value)
}

fn validate_marker(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() || value.contains('/') {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("invalid marker '{value}'"),
        ));
    }
    Ok(())
}

/// Parse and validate the API root.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL must have a host".to_string(),
        ));
    }
    Ok(url)
}
