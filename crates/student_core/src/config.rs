//! Store backend configuration.
//!
//! # Responsibility
//! - Describe which backend the screens talk to (hosted REST or local SQLite).
//! - Resolve and validate settings from environment-style key lookups.
//!
//! # Invariants
//! - A `RemoteConfig` always holds an http(s) base URL, a non-empty key, a
//!   plain identifier as table name and a non-zero timeout.
//! - `STUDENT_MANAGER_DB_PATH` wins over the remote settings when both exist.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_REMOTE_URL: &str = "SUPABASE_URL";
pub const ENV_API_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_DB_PATH: &str = "STUDENT_MANAGER_DB_PATH";
pub const ENV_TABLE: &str = "STUDENT_MANAGER_TABLE";
pub const ENV_TIMEOUT_SECS: &str = "STUDENT_MANAGER_TIMEOUT_SECS";

pub const DEFAULT_TABLE: &str = "students";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid table name regex"));
static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s?#]*$").expect("valid url regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidUrl(String),
    EmptyApiKey,
    InvalidTable(String),
    InvalidTimeout(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing configuration value `{key}`"),
            Self::InvalidUrl(value) => {
                write!(f, "store url must start with http:// or https://, got `{value}`")
            }
            Self::EmptyApiKey => write!(f, "store api key cannot be empty"),
            Self::InvalidTable(value) => write!(f, "invalid table name `{value}`"),
            Self::InvalidTimeout(value) => {
                write!(f, "timeout must be a positive number of seconds, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Hosted REST backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    base_url: String,
    api_key: String,
    table: String,
    timeout: Duration,
}

impl RemoteConfig {
    /// Validates the project URL and key; table and timeout take defaults.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !HTTP_URL_RE.is_match(base_url) {
            return Err(ConfigError::InvalidUrl(base_url.to_string()));
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            table: DEFAULT_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_table(mut self, table: &str) -> Result<Self, ConfigError> {
        let table = table.trim();
        if !TABLE_NAME_RE.is_match(table) {
            return Err(ConfigError::InvalidTable(table.to_string()));
        }
        self.table = table.to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("0".to_string()));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// REST endpoint of the configured table, e.g.
    /// `https://xyz.supabase.co/rest/v1/students`.
    pub fn table_endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

/// Which backend the screens use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Remote(RemoteConfig),
    Local { db_path: PathBuf },
}

impl StoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = get(ENV_DB_PATH) {
            return Ok(Self::Local {
                db_path: PathBuf::from(path),
            });
        }

        let base_url = get(ENV_REMOTE_URL).ok_or(ConfigError::Missing(ENV_REMOTE_URL))?;
        let api_key = get(ENV_API_KEY).ok_or(ConfigError::Missing(ENV_API_KEY))?;
        let mut remote = RemoteConfig::new(&base_url, &api_key)?;

        if let Some(table) = get(ENV_TABLE) {
            remote = remote.with_table(&table)?;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            let secs = raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            remote = remote
                .with_timeout(Duration::from_secs(secs))
                .map_err(|_| ConfigError::InvalidTimeout(raw))?;
        }

        Ok(Self::Remote(remote))
    }

    /// Short backend label for logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Remote(_) => "postgrest",
            Self::Local { .. } => "sqlite",
        }
    }
}
