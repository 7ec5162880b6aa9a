use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Directory holding the single-page UI
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 5000))
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize::kib(64)
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub max_workers: WorkerCount,
    /// How long one dequeue waits before the dispatcher loops again
    #[serde(default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,
}

impl WorkersConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_workers: WorkerCount::default(),
            dequeue_timeout_ms: default_dequeue_timeout_ms(),
        }
    }
}

fn default_dequeue_timeout_ms() -> u64 {
    1000
}

/// yt-dlp invocation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Passed as `--ffmpeg-location`; dropped at load time if missing on disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_location: Option<PathBuf>,
    /// Netscape cookie jar; dropped at load time if missing on disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies_file: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// Skip URLs already recorded in the output directory's download archive
    #[serde(default)]
    pub use_archive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            ffmpeg_location: None,
            cookies_file: None,
            output_dir: default_output_dir(),
            audio_format: default_audio_format(),
            use_archive: false,
            timeout_secs: None,
        }
    }
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

/// Number of worker slots, always at least one
///
/// Parsing never fails: anything that is not a positive integer falls back
/// to [`WorkerCount::DEFAULT`] with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkerCount(usize);

impl WorkerCount {
    pub const DEFAULT: usize = 3;

    pub fn new(n: usize) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Like [`WorkerCount::new`], but zero falls back to the default
    pub fn or_default(n: usize) -> Self {
        Self::new(n).unwrap_or_else(|| Self::fallback(n))
    }

    /// Interpret a raw setting such as an environment variable value
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().parse::<usize>().ok().and_then(Self::new) {
            Some(count) => count,
            None => Self::fallback(raw),
        }
    }

    fn fallback(raw: impl fmt::Display) -> Self {
        tracing::warn!(
            value = %raw,
            default = Self::DEFAULT,
            "Invalid max_workers, using default"
        );
        Self::default()
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl<'de> Deserialize<'de> for WorkerCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct WorkerCountVisitor;

        impl serde::de::Visitor<'_> for WorkerCountVisitor {
            type Value = WorkerCount;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive worker count")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(match usize::try_from(v) {
                    Ok(n) => WorkerCount::or_default(n),
                    Err(_) => WorkerCount::fallback(v),
                })
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                match u64::try_from(v) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Ok(WorkerCount::fallback(v)),
                }
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(WorkerCount::fallback(v))
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(WorkerCount::fallback(v))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(WorkerCount::parse_lenient(v))
            }
        }

        deserializer.deserialize_any(WorkerCountVisitor)
    }
}
