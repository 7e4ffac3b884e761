//! Configuration module
//!
//! All settings are read from the environment once at startup into a
//! [`Config`] that is then passed by reference into the transport client,
//! the ingestion pipeline, the polling loop and the web surface.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_UPLOAD_SIZE_MB, PLACEHOLDER_BOT_TOKEN};

// Common constants
const SERVER_PORT: u16 = 5000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const POLL_TIMEOUT_SECS: u64 = 30;
const HTTP_TIMEOUT_SECS: u64 = 60;
const POLL_BACKOFF_SECS: u64 = 5;
const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const UPLOAD_DIR: &str = "static/uploads";

/// Public URL hints checked in order when `BASE_URL` is absent.
/// The bool marks hints that carry a bare host and need a scheme.
const BASE_URL_HINTS: &[(&str, bool)] = &[
    ("BASE_URL", false),
    ("PUBLIC_URL", false),
    ("RENDER_EXTERNAL_URL", false),
    ("RAILWAY_PUBLIC_DOMAIN", true),
    ("REPLIT_DEV_DOMAIN", true),
];

/// Settings shared by the web surface and the worker.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Image host configuration
#[derive(Clone)]
pub struct ImageHostConfig {
    pub base: BaseConfig,
    pub database_url: String,
    /// Raw token as found in the environment; checked by [`Config::bot_token`].
    pub bot_token: Option<String>,
    pub telegram_api_url: String,
    /// Public base for generated links, without trailing slash.
    pub base_url: String,
    pub upload_dir: PathBuf,
    pub poll_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub poll_backoff_secs: u64,
    pub max_upload_size_bytes: u64,
    pub drop_pending_updates: bool,
}

impl std::fmt::Debug for ImageHostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHostConfig")
            .field("base", &self.base)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("telegram_api_url", &self.telegram_api_url)
            .field("base_url", &self.base_url)
            .field("upload_dir", &self.upload_dir)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("poll_backoff_secs", &self.poll_backoff_secs)
            .field("max_upload_size_bytes", &self.max_upload_size_bytes)
            .field("drop_pending_updates", &self.drop_pending_updates)
            .finish_non_exhaustive()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageHostConfig>);

impl Config {
    fn inner(&self) -> &ImageHostConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = ImageHostConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// The bot token, or an error when it is missing or still the placeholder.
    /// The polling loop refuses to start without a usable token.
    pub fn bot_token(&self) -> Result<&str, anyhow::Error> {
        match self.inner().bot_token.as_deref().map(str::trim) {
            None | Some("") => Err(anyhow::anyhow!("TELEGRAM_BOT_TOKEN must be set")),
            Some(PLACEHOLDER_BOT_TOKEN) => Err(anyhow::anyhow!(
                "TELEGRAM_BOT_TOKEN still holds the placeholder value"
            )),
            Some(token) => Ok(token),
        }
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn telegram_api_url(&self) -> &str {
        &self.inner().telegram_api_url
    }

    pub fn base_url(&self) -> &str {
        &self.inner().base_url
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        &self.inner().upload_dir
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().poll_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().http_timeout_secs)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_secs(self.inner().poll_backoff_secs)
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.inner().max_upload_size_bytes
    }

    pub fn drop_pending_updates(&self) -> bool {
        self.inner().drop_pending_updates
    }
}

impl ImageHostConfig {
    /// Build the configuration from a key lookup. `from_env` passes
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port: u16 = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let base = BaseConfig {
            server_port,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let max_upload_size_mb = lookup("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_MB);

        let config = ImageHostConfig {
            database_url: lookup("DATABASE_URL")
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            bot_token: lookup("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: lookup("TELEGRAM_API_URL")
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| TELEGRAM_API_URL.to_string()),
            base_url: resolve_base_url(&lookup, server_port),
            upload_dir: lookup("UPLOAD_DIR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UPLOAD_DIR.to_string())
                .into(),
            poll_timeout_secs: lookup("POLL_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POLL_TIMEOUT_SECS),
            http_timeout_secs: lookup("HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(HTTP_TIMEOUT_SECS),
            poll_backoff_secs: lookup("POLL_BACKOFF_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(POLL_BACKOFF_SECS),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            drop_pending_updates: lookup("DROP_PENDING_UPDATES")
                .map(|s| s.trim().to_lowercase())
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            base,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.poll_timeout_secs == 0 {
            return Err(anyhow::anyhow!("POLL_TIMEOUT_SECS must be greater than 0"));
        }

        if !(1..=60).contains(&self.poll_backoff_secs) {
            return Err(anyhow::anyhow!(
                "POLL_BACKOFF_SECS must be between 1 and 60"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "BASE_URL must start with http:// or https://"
            ));
        }

        Ok(())
    }
}

/// Resolve the public base URL through the hint chain, ending at localhost.
pub fn resolve_base_url<F>(lookup: F, port: u16) -> String
where
    F: Fn(&str) -> Option<String>,
{
    for (key, bare_host) in BASE_URL_HINTS {
        let Some(value) = lookup(key) else {
            continue;
        };
        let value = value.trim().trim_end_matches('/');
        if value.is_empty() {
            continue;
        }
        if *bare_host && !value.contains("://") {
            return format!("https://{}", value);
        }
        return value.to_string();
    }
    format!("http://localhost:{}", port)
}
