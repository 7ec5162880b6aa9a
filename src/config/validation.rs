use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("workers.dequeue_timeout_ms must be positive")]
    ZeroDequeueTimeout,

    #[error("fetcher.binary must not be empty")]
    EmptyBinary,

    #[error("fetcher.output_dir must not be empty")]
    EmptyOutputDir,

    #[error("fetcher.audio_format must not be empty")]
    EmptyAudioFormat,

    #[error("fetcher.timeout_secs must be positive when set")]
    ZeroTimeout,
}

/// Validate the entire configuration
///
/// Only structural mistakes are errors. Recoverable values (worker count,
/// missing optional paths) were already normalized while loading.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.workers.dequeue_timeout_ms == 0 {
        return Err(ValidationError::ZeroDequeueTimeout);
    }

    let fetcher = &config.fetcher;
    if fetcher.binary.trim().is_empty() {
        return Err(ValidationError::EmptyBinary);
    }
    if fetcher.output_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyOutputDir);
    }
    if fetcher.audio_format.trim().is_empty() {
        return Err(ValidationError::EmptyAudioFormat);
    }
    if fetcher.timeout_secs == Some(0) {
        return Err(ValidationError::ZeroTimeout);
    }

    Ok(())
}
