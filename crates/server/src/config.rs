//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_API_KEY` - Shopify app OAuth client ID
//! - `SHOPIFY_API_SECRET` - Shopify app OAuth client secret (high entropy)
//! - `CATALOG_APP_URL` - Public URL of this server (OAuth `redirect_uri` base)
//!
//! ## Optional
//! - `SHOPIFY_SCOPES` - Comma-separated scopes (default: read/write products and orders)
//! - `SHOPIFY_API_VERSION` - Admin REST API version (default: 2025-01)
//! - `SHOPIFY_API_ORIGIN` - Send all per-shop calls to this origin instead of `https://<shop>`
//! - `SHOPIFY_HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 30)
//! - `CATALOG_ENV` - `production` or `development` (default: development)
//! - `CATALOG_BACKEND_URL` - Target of the install form redirect (default: `CATALOG_APP_URL`)
//! - `CATALOG_FRONTEND_URL` - Frontend origin used after OAuth in development
//!   (default: <http://localhost:5173>)
//! - `CATALOG_HOST` - Bind address (default: 127.0.0.1)
//! - `CATALOG_PORT` - Backend listen port (default: 3000)
//! - `CATALOG_FRONTEND_PORT` - Frontend listen port in development (default: 5173)
//! - `CATALOG_SESSION_DATABASE_URL` - `SQLite` URL of the Shopify session storage
//!   (default: `sqlite://sessions.sqlite?mode=rwc`)
//! - `CATALOG_STATIC_DIR` - Built frontend assets (default: crates/server/static)
//! - `CATALOG_LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SCOPES: &str = "read_products,write_products,read_orders,write_orders";
const DEFAULT_API_VERSION: &str = "2025-01";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment mode. Decides where the OAuth callback sends the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    Production,
    #[default]
    Development,
}

impl std::str::FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("expected production or development, got {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Backend port
    pub port: u16,
    /// Frontend port (development only)
    pub frontend_port: u16,
    /// Public base URL of this server
    pub app_url: String,
    /// Where the install form sends the browser to begin OAuth
    pub backend_url: String,
    /// Frontend origin the callback redirects to in development
    pub frontend_url: String,
    /// Production or development
    pub environment: AppEnvironment,
    /// Shopify app credentials and API settings
    pub shopify: ShopifyAppConfig,
    /// `SQLite` URL for the persistent Shopify session storage
    pub session_database_url: SecretString,
    /// Directory holding the built frontend assets
    pub static_dir: PathBuf,
    /// Text or JSON logs
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// OAuth client ID (API key)
    pub api_key: String,
    /// OAuth client secret, also the HMAC key for callbacks
    pub api_secret: SecretString,
    /// Requested access scopes
    pub scopes: Vec<String>,
    /// Admin REST API version (e.g., 2025-01)
    pub api_version: String,
    /// Replaces `https://<shop>` for every per-shop call when set
    pub api_origin: Option<Url>,
    /// Timeout applied to every outbound request
    pub http_timeout: Duration,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("api_version", &self.api_version)
            .field("api_origin", &self.api_origin)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("CATALOG_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_HOST".to_string(), e.to_string()))?;
        let port = parse_port("CATALOG_PORT", "3000")?;
        let frontend_port = parse_port("CATALOG_FRONTEND_PORT", "5173")?;

        let app_url = get_url("CATALOG_APP_URL", None)?;
        let backend_url = get_url("CATALOG_BACKEND_URL", Some(&app_url))?;
        let frontend_url = get_url("CATALOG_FRONTEND_URL", Some("http://localhost:5173"))?;

        let environment = get_env_or_default("CATALOG_ENV", "development")
            .parse::<AppEnvironment>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_ENV".to_string(), e))?;

        let log_format = match get_env_or_default("CATALOG_LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CATALOG_LOG_FORMAT".to_string(),
                    format!("expected text or json, got {other}"),
                ));
            }
        };

        let shopify = ShopifyAppConfig::from_env()?;
        let session_database_url = SecretString::from(get_env_or_default(
            "CATALOG_SESSION_DATABASE_URL",
            "sqlite://sessions.sqlite?mode=rwc",
        ));
        let static_dir = PathBuf::from(get_env_or_default(
            "CATALOG_STATIC_DIR",
            "crates/server/static",
        ));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            frontend_port,
            app_url,
            backend_url,
            frontend_url,
            environment,
            shopify,
            session_database_url,
            static_dir,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for the backend listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the socket address for the development frontend listener.
    #[must_use]
    pub const fn frontend_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.frontend_port)
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == AppEnvironment::Production
    }

    /// The `redirect_uri` registered with Shopify.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_url.trim_end_matches('/'))
    }

    /// Where the browser goes once OAuth completes for `shop`.
    #[must_use]
    pub fn post_auth_redirect(&self, shop: &str) -> String {
        let shop = urlencoding::encode(shop);
        match self.environment {
            AppEnvironment::Production => format!("/products?shop={shop}"),
            AppEnvironment::Development => format!(
                "{}/auth/callback?shop={shop}",
                self.frontend_url.trim_end_matches('/')
            ),
        }
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_origin = get_optional_env("SHOPIFY_API_ORIGIN")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("SHOPIFY_API_ORIGIN".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let timeout_secs = get_env_or_default("SHOPIFY_HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPIFY_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            scopes: parse_scopes(&get_env_or_default("SHOPIFY_SCOPES", DEFAULT_SCOPES)),
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            api_origin,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Split a comma-separated scope list, dropping blanks.
#[must_use]
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_port(key: &str, default: &str) -> Result<u16, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Read an http(s) URL, without a trailing slash.
fn get_url(key: &str, default: Option<&str>) -> Result<String, ConfigError> {
    let raw = match (get_optional_env(key), default) {
        (Some(value), _) => value,
        (None, Some(default)) => default.to_string(),
        (None, None) => return Err(ConfigError::MissingEnvVar(key.to_string())),
    };
    validate_http_url(&raw)
        .map(|()| raw.trim_end_matches('/').to_string())
        .map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn validate_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err("URL must have a host".to_string()),
        scheme => Err(format!("unsupported scheme {scheme}")),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret from the Shopify partner dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
