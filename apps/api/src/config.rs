//! API server configuration.
//!
//! Loaded with the `config` crate from, in order of precedence:
//! process environment > optional `pharmacy.toml` > built-in defaults.
//! Keys are the lowercase environment variable names (`PORT` → `port`).

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

/// Signing secret used when `JWT_SECRET` is not set. Fine for development,
/// never for production.
pub const DEV_JWT_SECRET: &str = "dev_jwt_secret_change_me";

/// Seven days, the lifetime of both tokens and sessions by default.
const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

/// Origins the dashboard and storefront are served from when no
/// `FRONTEND_URL` / `FRONTEND_ORIGINS` is configured.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:3001",
    "https://fantyfresh.com",
    "https://www.fantyfresh.com",
    "https://adminfanty.vercel.app",
];

/// API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    pub database_max_connections: u32,

    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds
    pub jwt_expires_in_secs: i64,

    /// Server-side session lifetime in seconds (also the cookie Max-Age)
    pub session_ttl_secs: i64,

    /// Add `Secure` to the session cookie
    pub cookie_secure: bool,

    /// Comma-separated CORS origins. Takes precedence over `frontend_origins`.
    #[serde(default)]
    pub frontend_url: Option<String>,

    #[serde(default)]
    pub frontend_origins: Option<String>,

    /// Wrap sale creation in a database transaction instead of compensating
    /// on failure.
    pub sales_use_transactions: bool,

    pub notification_check_interval_minutes: u64,

    pub session_cleanup_interval_minutes: u64,

    /// Read notifications older than this are deleted by the cleanup job.
    pub notification_retention_days: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 4000,
            database_path: "pharmacy.db".to_string(),
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in_secs: WEEK_SECS,
            session_ttl_secs: WEEK_SECS,
            cookie_secure: false,
            frontend_url: None,
            frontend_origins: None,
            sales_use_transactions: false,
            notification_check_interval_minutes: 60,
            session_cleanup_interval_minutes: 60,
            notification_retention_days: 30,
        }
    }
}

impl ApiConfig {
    /// Load configuration from defaults, `pharmacy.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_path", defaults.database_path)?
            .set_default("database_max_connections", i64::from(defaults.database_max_connections))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expires_in_secs", defaults.jwt_expires_in_secs)?
            .set_default("session_ttl_secs", defaults.session_ttl_secs)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .set_default("sales_use_transactions", defaults.sales_use_transactions)?
            .set_default(
                "notification_check_interval_minutes",
                defaults.notification_check_interval_minutes,
            )?
            .set_default(
                "session_cleanup_interval_minutes",
                defaults.session_cleanup_interval_minutes,
            )?
            .set_default("notification_retention_days", defaults.notification_retention_days)?
            .add_source(File::with_name("pharmacy").required(false))
            .add_source(Environment::default())
            .build()?;

        let config: ApiConfig = config.try_deserialize()?;
        config.validate()?;

        if config.uses_dev_secret() {
            warn!("JWT_SECRET is not set; using the development secret");
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("jwt_secret".to_string()));
        }
        if self.jwt_expires_in_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_expires_in_secs".to_string()));
        }
        if self.session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue("session_ttl_secs".to_string()));
        }
        if self.notification_check_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "notification_check_interval_minutes".to_string(),
            ));
        }
        if self.session_cleanup_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "session_cleanup_interval_minutes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins: the configured list, or the built-in defaults.
    pub fn cors_origins(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .frontend_url
            .as_deref()
            .or(self.frontend_origins.as_deref())
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if configured.is_empty() {
            DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            configured
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
