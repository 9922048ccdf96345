//! Configuration management for gr

pub mod schema;

pub use schema::Config;

use crate::error::{GrError, GrResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "GR_CONFIG";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gr")
            .join("config.toml")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> GrResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file {} not found, using defaults", self.config_path.display());
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and validate configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GrResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GrError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| GrError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::validate(&config).map_err(|reason| GrError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), String> {
        if config.cache.keep_entries == 0 {
            return Err("cache.keep_entries must be at least 1".to_string());
        }
        if config.build.go.is_empty() {
            return Err("build.go must not be empty".to_string());
        }
        if let Some(name) = config
            .build
            .extra_env
            .iter()
            .find(|name| name.is_empty() || name.contains('='))
        {
            return Err(format!("build.extra_env: invalid variable name {name:?}"));
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
