use std::env;

use thiserror::Error;

const DEFAULT_KNOCK_API_URL: &str = "https://api.knock.app";
const DEFAULT_KNOCK_WORKFLOW_KEY: &str = "booking-confirmed";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing env var {0}")]
    Missing(&'static str),
    #[error("Invalid value for env var {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where booking and profile records live.
#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseConfig {
    /// Local SQLite file
    Sqlite { path: String },
    /// PostgREST endpoint of the hosted database, authenticated with a
    /// service key that bypasses row level security.
    Rest { url: String, service_key: String },
}

impl DatabaseConfig {
    /// Only the database settings, for commands that don't talk to
    /// the webhook sender or the notification provider.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let database_url = require("BOOKINGS_DATABASE_URL")?;
        if database_url.starts_with("http://") || database_url.starts_with("https://") {
            let service_key = require("BOOKINGS_DATABASE_SERVICE_KEY")?;
            return Ok(DatabaseConfig::Rest {
                url: database_url.trim_end_matches('/').to_string(),
                service_key,
            });
        }

        let path = database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&database_url)
            .to_string();
        if path.is_empty() {
            return Err(ConfigError::Invalid {
                var: "BOOKINGS_DATABASE_URL",
                reason: "empty sqlite path".to_string(),
            });
        }
        Ok(DatabaseConfig::Sqlite { path })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub webhook_secret: String,
    pub knock_api_key: String,
    pub knock_api_url: String,
    pub knock_workflow_key: String,
}

impl AppConfig {
    /// Read and validate the configuration from the process
    /// environment. Call this once at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as missing so a stray `FOO=` in an env
        // file fails at startup instead of at the first request
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let database = DatabaseConfig::from_lookup(&lookup)?;

        let webhook_secret = require("CAL_WEBHOOK_SECRET")?;
        let knock_api_key = require("KNOCK_API_SECRET")?;

        let knock_api_url = get("KNOCK_API_URL")
            .unwrap_or_else(|| DEFAULT_KNOCK_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(knock_api_url.starts_with("http://") || knock_api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "KNOCK_API_URL",
                reason: format!("expected an http(s) URL, got {}", knock_api_url),
            });
        }
        let knock_workflow_key =
            get("KNOCK_WORKFLOW_KEY").unwrap_or_else(|| DEFAULT_KNOCK_WORKFLOW_KEY.to_string());

        Ok(Self {
            database,
            webhook_secret,
            knock_api_key,
            knock_api_url,
            knock_workflow_key,
        })
    }
}
