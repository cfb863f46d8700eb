//! Connection parameters for [`crate::Db`].
//!
//! Every field has a documented default and can be overridden at
//! construction, either through the `with_*` builders or from the
//! environment via [`DbConfig::from_env`].

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 28015;
pub const DEFAULT_DB: &str = "picter";

pub const ENV_HOST: &str = "PICTER_DB_HOST";
pub const ENV_PORT: &str = "PICTER_DB_PORT";
pub const ENV_DB: &str = "PICTER_DB_NAME";
pub const ENV_DATA_DIR: &str = "PICTER_DB_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid port `{0}` in PICTER_DB_PORT")]
    InvalidPort(String),
}

/// Where and which database to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Store host. Defaults to `localhost`.
    pub host: String,
    /// Store port. Defaults to `28015`.
    pub port: u16,
    /// Database name inside the store. Defaults to `picter`.
    pub db: String,
    /// Directory holding file-backed stores. `None` keeps the store in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db: DEFAULT_DB.to_string(),
            data_dir: None,
        }
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Reads overrides from `PICTER_DB_*` variables. Unset or blank variables
    /// keep their defaults.
    ///
    /// # Errors
    /// - Returns [`ConfigError::InvalidPort`] when the port does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(host) = read(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = read(ENV_PORT) {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Some(db) = read(ENV_DB) {
            config.db = db;
        }
        config.data_dir = read(ENV_DATA_DIR).map(PathBuf::from);
        Ok(config)
    }

    /// `host:port`, as used in log lines and connection errors.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
