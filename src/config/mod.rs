//! Configuration management for grabbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use grabbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `GRABBOX__<section>__<key>`
//!
//! Examples:
//! - `GRABBOX__SERVER__BIND_ADDR=0.0.0.0:5000`
//! - `GRABBOX__WORKERS__MAX_WORKERS=4`
//! - `GRABBOX__FETCHER__COOKIES_FILE=/secrets/cookies.txt`
//!
//! `DOWNLOADER_MAX_WORKERS` and `DOWNLOADER_COOKIES_PATH` are still read
//! when their prefixed counterpart is absent.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/grabbox.toml`.
//! This can be overridden using the `GRABBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, FetcherConfig, ServerConfig, WorkerCount, WorkersConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`GRABBOX__*`, then legacy `DOWNLOADER_*`)
    /// 2. TOML file (default: `config/grabbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a
    /// structural setting is invalid (see [`ValidationError`]).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Same as [`Config::load`] with an explicit file taking precedence
    /// over `GRABBOX_CONFIG`
    pub fn load_with(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::finish(sources::load(path)?)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Self::finish(sources::load_from_sources(path)?)
    }

    fn finish(mut config: Self) -> Result<Self, ConfigError> {
        sources::discard_missing_paths(&mut config.fetcher);
        validation::validate(&config)?;
        Ok(config)
    }
}
