//! Server configuration
//!
//! Resolved in layers: built-in defaults, then `CADENCE_*` environment
//! variables, then command-line flags.

use std::path::PathBuf;

use cadence_core::{DueQueueConfig, DEFAULT_DUE_LIMIT, DEFAULT_NEW_CARD_CAP};
use directories::ProjectDirs;

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "cadence.db";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3930;

/// Conflict retries for HTTP submissions
pub const DEFAULT_CONFLICT_RETRIES: u32 = 2;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
    #[error("Could not determine a data directory; pass --data-dir or set CADENCE_DATA_DIR")]
    NoDataDir,
}

/// Runtime configuration for the API server and CLI
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Directory holding the database; `None` uses the platform default
    pub data_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub due_limit: usize,
    pub new_card_cap: usize,
    pub conflict_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            due_limit: DEFAULT_DUE_LIMIT,
            new_card_cap: DEFAULT_NEW_CARD_CAP,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

/// Values supplied on the command line; `None` keeps the lower layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub due_limit: Option<usize>,
    pub new_card_cap: Option<usize>,
    pub conflict_retries: Option<u32>,
}

impl ServerConfig {
    /// Defaults overlaid with process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("CADENCE_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(host) = get("CADENCE_HOST") {
            config.host = host;
        }
        if let Some(value) = get("CADENCE_PORT") {
            config.port = parse_var("CADENCE_PORT", value)?;
        }
        if let Some(value) = get("CADENCE_DUE_LIMIT") {
            config.due_limit = parse_var("CADENCE_DUE_LIMIT", value)?;
        }
        if let Some(value) = get("CADENCE_NEW_CARD_CAP") {
            config.new_card_cap = parse_var("CADENCE_NEW_CARD_CAP", value)?;
        }
        if let Some(value) = get("CADENCE_CONFLICT_RETRIES") {
            config.conflict_retries = parse_var("CADENCE_CONFLICT_RETRIES", value)?;
        }

        Ok(config)
    }

    /// Apply command-line values on top
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(dir) = overrides.data_dir {
            self.data_dir = Some(dir);
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(limit) = overrides.due_limit {
            self.due_limit = limit;
        }
        if let Some(cap) = overrides.new_card_cap {
            self.new_card_cap = cap;
        }
        if let Some(retries) = overrides.conflict_retries {
            self.conflict_retries = retries;
        }
        self
    }

    /// Default due-queue sizing for requests that do not specify one
    pub fn due_queue(&self) -> DueQueueConfig {
        DueQueueConfig {
            limit: self.due_limit,
            new_card_cap: self.new_card_cap,
        }
    }

    /// Database file location
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(dir.join(DB_FILE_NAME))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Platform data directory (e.g. `~/.local/share/cadence` on Linux)
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("com", "cadence", "cadence")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
