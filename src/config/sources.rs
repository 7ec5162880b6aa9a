use super::models::{Config, FetcherConfig, WorkerCount};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "GRABBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/grabbox.toml";
const ENV_PREFIX: &str = "GRABBOX";
const ENV_SEPARATOR: &str = "__";

/// Variables understood by earlier deployments of the downloader
const LEGACY_COOKIES_VAR: &str = "DOWNLOADER_COOKIES_PATH";
const LEGACY_WORKERS_VAR: &str = "DOWNLOADER_MAX_WORKERS";
const MAX_WORKERS_VAR: &str = "GRABBOX__WORKERS__MAX_WORKERS";
const COOKIES_VAR: &str = "GRABBOX__FETCHER__COOKIES_FILE";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
///
/// `path` wins over `GRABBOX_CONFIG`, which wins over the default location.
pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = path
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    apply_legacy_env(&mut config, |name| env::var(name).ok());

    Ok(config)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // GRABBOX__WORKERS__MAX_WORKERS -> workers.max_workers
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// Honor the legacy variables unless their prefixed replacement is set
pub(crate) fn apply_legacy_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if lookup(MAX_WORKERS_VAR).is_none() {
        if let Some(raw) = lookup(LEGACY_WORKERS_VAR) {
            config.workers.max_workers = WorkerCount::parse_lenient(&raw);
        }
    }

    if lookup(COOKIES_VAR).is_none() {
        if let Some(path) = lookup(LEGACY_COOKIES_VAR).filter(|p| !p.trim().is_empty()) {
            config.fetcher.cookies_file = Some(PathBuf::from(path));
        }
    }
}

/// Drop optional paths that point at nothing
///
/// A missing cookie jar or ffmpeg location is not fatal: downloads still
/// run, just without it.
pub(crate) fn discard_missing_paths(fetcher: &mut FetcherConfig) {
    if let Some(path) = fetcher.cookies_file.take_if(|p| !p.exists()) {
        tracing::warn!(path = %path.display(), "Cookies file not found, continuing without cookies");
    }

    if let Some(path) = fetcher.ffmpeg_location.take_if(|p| !p.exists()) {
        tracing::warn!(path = %path.display(), "ffmpeg location not found, relying on PATH");
    }
}
