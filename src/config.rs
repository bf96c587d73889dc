use std::time::Duration;

use thiserror::Error;

use crate::models::DEFAULT_MODEL;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not a valid number: '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("SUPABASE_URL is set but SUPABASE_SERVICE_ROLE_KEY is missing")]
    MissingServiceKey,

    #[error("No persistence store configured: set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY, or DATABASE_URL")]
    NoStore,
}

/// Where transcripts are written.
#[derive(Clone)]
pub enum StoreConfig {
    /// PostgREST endpoint (e.g. Supabase), authenticated with a service key.
    Rest { base_url: String, service_key: String },
    /// Direct Postgres connection.
    Postgres { database_url: String },
}

impl StoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Rest { .. } => "rest",
            StoreConfig::Postgres { .. } => "postgres",
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Rest { base_url, .. } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("service_key", &"***")
                .finish(),
            StoreConfig::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"***")
                .finish(),
        }
    }
}

/// Process-wide settings, read once at startup and immutable afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub default_model: String,
    pub store: StoreConfig,
    pub completion_timeout: Duration,
    pub store_timeout: Duration,
    pub port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"***")
            .field("openai_base_url", &self.openai_base_url)
            .field("default_model", &self.default_model)
            .field("store", &self.store)
            .field("completion_timeout", &self.completion_timeout)
            .field("store_timeout", &self.store_timeout)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let openai_base_url = get("OPENAI_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let default_model = get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let store = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_ROLE_KEY"), get("DATABASE_URL")) {
            (Some(base_url), Some(service_key), _) => StoreConfig::Rest {
                base_url: base_url.trim_end_matches('/').to_string(),
                service_key,
            },
            (Some(_), None, _) => return Err(ConfigError::MissingServiceKey),
            (None, _, Some(database_url)) => StoreConfig::Postgres { database_url },
            (None, _, None) => return Err(ConfigError::NoStore),
        };

        let completion_timeout = Duration::from_secs(parse_or(
            get("COMPLETION_TIMEOUT_SECS"),
            "COMPLETION_TIMEOUT_SECS",
            DEFAULT_COMPLETION_TIMEOUT_SECS,
        )?);
        let store_timeout = Duration::from_secs(parse_or(
            get("STORE_TIMEOUT_SECS"),
            "STORE_TIMEOUT_SECS",
            DEFAULT_STORE_TIMEOUT_SECS,
        )?);
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;

        Ok(Self {
            openai_api_key,
            openai_base_url,
            default_model,
            store,
            completion_timeout,
            store_timeout,
            port,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: v }),
    }
}
