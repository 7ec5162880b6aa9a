//! yt-dlp backed fetcher: download, extract audio, embed metadata

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, Fetcher, Result};
use crate::config::FetcherConfig;

/// Lines of tool output kept as failure diagnostics
const DIAGNOSTIC_LINES: usize = 12;
const DIAGNOSTIC_MAX_CHARS: usize = 2000;

/// Name of the yt-dlp download archive inside the output directory
pub const ARCHIVE_FILE: &str = ".download-archive.txt";

/// yt-dlp invocation settings
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub binary: String,
    pub ffmpeg_location: Option<PathBuf>,
    pub cookies_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub use_archive: bool,
    pub timeout: Option<Duration>,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            ffmpeg_location: None,
            cookies_file: None,
            output_dir: PathBuf::from("downloads"),
            audio_format: "mp3".to_string(),
            use_archive: false,
            timeout: None,
        }
    }
}

impl From<&FetcherConfig> for YtDlpOptions {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            ffmpeg_location: config.ffmpeg_location.clone(),
            cookies_file: config.cookies_file.clone(),
            output_dir: config.output_dir.clone(),
            audio_format: config.audio_format.clone(),
            use_archive: config.use_archive,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Runs one yt-dlp process per URL
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    options: YtDlpOptions,
}

impl YtDlpFetcher {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    /// Command line for one URL, binary excluded
    pub fn build_args(&self, url: &str) -> Vec<String> {
        let opts = &self.options;
        let mut args = Vec::new();

        if let Some(ffmpeg) = &opts.ffmpeg_location {
            args.push(format!("--ffmpeg-location={}", ffmpeg.display()));
        }

        args.extend(
            [
                "--no-progress",
                "-x",
                "--audio-format",
                opts.audio_format.as_str(),
                "--embed-metadata",
                "--embed-thumbnail",
            ]
            .map(str::to_owned),
        );

        if let Some(cookies) = &opts.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        if opts.use_archive {
            args.push("--download-archive".to_string());
            args.push(opts.output_dir.join(ARCHIVE_FILE).display().to_string());
        }

        args.push("-o".to_string());
        args.push(output_template(&opts.output_dir));

        // URLs starting with '-' must not be read as options
        args.push("--".to_string());
        args.push(url.to_string());

        args
    }

    /// Ask the tool for its version; `None` when it cannot be run
    pub async fn probe(&self) -> Option<String> {
        let output = Command::new(&self.options.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(tool = %self.options.binary, %version, "Found download tool");
                Some(version)
            }
            Ok(output) => {
                warn!(tool = %self.options.binary, status = %output.status, "Download tool --version failed");
                None
            }
            Err(e) => {
                warn!(tool = %self.options.binary, error = %e, "Download tool not available; submissions will fail");
                None
            }
        }
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<()> {
        let opts = &self.options;

        // Several workers may race to create it
        tokio::fs::create_dir_all(&opts.output_dir).await?;

        let args = self.build_args(url);
        debug!(url, binary = %opts.binary, ?args, "Spawning download tool");

        let mut command = Command::new(&opts.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| FetchError::TimedOut(limit))?,
            None => command.output().await,
        }
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::ToolNotFound {
                tool: opts.binary.clone(),
            },
            _ => FetchError::Io(e),
        })?;

        if !output.status.success() {
            let diagnostics = summarize_output(&output.stderr, &output.stdout);
            debug!(url, status = %output.status, %diagnostics, "Download tool failed");
            return Err(FetchError::NonZeroExit {
                code: output.status.code(),
                diagnostics,
            });
        }

        info!(url, output_dir = %opts.output_dir.display(), "Download and conversion finished");
        Ok(())
    }

    fn tool(&self) -> &str {
        &self.options.binary
    }
}

fn output_template(output_dir: &Path) -> String {
    output_dir.join("%(title)s.%(ext)s").display().to_string()
}

/// Last few meaningful lines of the tool output, stderr preferred
pub fn summarize_output(stderr: &[u8], stdout: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let source = if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout)
    } else {
        stderr
    };

    let lines: Vec<&str> = source
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let tail = lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..].join("\n");

    if tail.chars().count() > DIAGNOSTIC_MAX_CHARS {
        let skip = tail.chars().count() - DIAGNOSTIC_MAX_CHARS;
        format!("...{}", tail.chars().skip(skip).collect::<String>())
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_defaults() {
        let options = YtDlpOptions::default();
        assert_eq!(options.binary, "yt-dlp");
        assert_eq!(options.audio_format, "mp3");
        assert_eq!(options.output_dir, PathBuf::from("downloads"));
        assert!(!options.use_archive);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn test_build_args_minimal() {
        let fetcher = YtDlpFetcher::new(YtDlpOptions::default());
        let args = fetcher.build_args("https://youtu.be/abc");
        let template = output_template(Path::new("downloads"));

        assert_eq!(
            args,
            vec![
                "--no-progress",
                "-x",
                "--audio-format",
                "mp3",
                "--embed-metadata",
                "--embed-thumbnail",
                "-o",
                template.as_str(),
                "--",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn test_build_args_with_everything() {
        let fetcher = YtDlpFetcher::new(YtDlpOptions {
            ffmpeg_location: Some(PathBuf::from("/opt/ffmpeg/bin")),
            cookies_file: Some(PathBuf::from("/secrets/cookies.txt")),
            output_dir: PathBuf::from("/srv/music"),
            audio_format: "opus".to_string(),
            use_archive: true,
            ..YtDlpOptions::default()
        });
        let args = fetcher.build_args("https://youtu.be/abc");

        assert_eq!(args[0], "--ffmpeg-location=/opt/ffmpeg/bin");
        assert!(args.windows(2).any(|w| w == ["--audio-format", "opus"]));
        assert!(args.windows(2).any(|w| w == ["--cookies", "/secrets/cookies.txt"]));

        let archive = Path::new("/srv/music").join(ARCHIVE_FILE).display().to_string();
        assert!(args.windows(2).any(|w| w[0] == "--download-archive" && w[1] == archive));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_summarize_prefers_stderr_tail() {
        let stderr = (1..=20)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let summary = summarize_output(stderr.as_bytes(), b"ignored");

        assert!(summary.starts_with("line 9"));
        assert!(summary.ends_with("line 20"));
        assert_eq!(summary.lines().count(), DIAGNOSTIC_LINES);
    }

    #[test]
    fn test_summarize_falls_back_to_stdout() {
        let summary = summarize_output(b"  \n", b"[youtube] abc: Downloading\n\nERROR: gone\n");
        assert_eq!(summary, "[youtube] abc: Downloading\nERROR: gone");
    }

    #[test]
    fn test_summarize_truncates_long_output() {
        let stderr = "x".repeat(DIAGNOSTIC_MAX_CHARS * 2);
        let summary = summarize_output(stderr.as_bytes(), b"");
        assert!(summary.starts_with("..."));
        assert_eq!(summary.chars().count(), DIAGNOSTIC_MAX_CHARS + 3);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(YtDlpOptions {
            binary: "grabbox-no-such-tool".to_string(),
            output_dir: temp_dir.path().join("out"),
            ..YtDlpOptions::default()
        });

        let err = fetcher.fetch("https://example.com/a").await.unwrap_err();
        assert!(matches!(err, FetchError::ToolNotFound { ref tool } if tool == "grabbox-no-such-tool"));
        // Output directory is prepared before the spawn
        assert!(temp_dir.path().join("out").is_dir());
        assert!(fetcher.probe().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(YtDlpOptions {
            binary: "false".to_string(),
            output_dir: temp_dir.path().to_path_buf(),
            ..YtDlpOptions::default()
        });

        let err = fetcher.fetch("https://example.com/a").await.unwrap_err();
        assert!(matches!(err, FetchError::NonZeroExit { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(YtDlpOptions {
            binary: "true".to_string(),
            output_dir: temp_dir.path().to_path_buf(),
            timeout: Some(Duration::from_secs(10)),
            ..YtDlpOptions::default()
        });

        fetcher.fetch("https://example.com/a").await.unwrap();
        assert_eq!(fetcher.tool(), "true");
    }
}
