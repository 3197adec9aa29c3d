//! core::config
//!
//! Engine settings loading.
//!
//! # Precedence
//!
//! Settings are resolved from the first file found, in this order:
//! 1. An explicit path passed by the caller
//! 2. `$GITDECK_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitdeck/config.toml`
//! 4. `<config dir>/gitdeck/config.toml` (platform config directory)
//!
//! When no file exists the defaults are used. A missing explicit path is an
//! error; missing implicit locations are not.
//!
//! # Example
//!
//! ```no_run
//! use gitdeck::core::config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("status limit: {}", loaded.config.status_limit);
//! ```

pub mod schema;

pub use schema::{EngineConfig, RefreshConfig, UntrackedPolicy};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The loaded settings.
    pub config: EngineConfig,
    /// File the settings came from, if any.
    pub path: Option<PathBuf>,
}

/// Settings loader.
pub struct Config;

impl Config {
    /// Environment variable naming an explicit config file.
    pub const ENV_VAR: &'static str = "GITDECK_CONFIG";

    /// Load settings using the documented precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated, or if `explicit` does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::read(path)?;
            return Ok(LoadedConfig {
                config,
                path: Some(path.to_path_buf()),
            });
        }

        for path in Self::candidates() {
            if path.exists() {
                let config = Self::read(&path)?;
                return Ok(LoadedConfig {
                    config,
                    path: Some(path),
                });
            }
        }

        Ok(LoadedConfig {
            config: EngineConfig::default(),
            path: None,
        })
    }

    /// Implicit config locations in precedence order.
    fn candidates() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(Self::ENV_VAR) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("gitdeck/config.toml"));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gitdeck/config.toml"));
        }
        paths
    }

    /// Read, parse and validate one config file.
    pub fn read(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EngineConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}
