/*!
 * External encoder invocation.
 *
 * `MediaEncoder` is the seam between the video assembler and the encoder
 * binary. `FfmpegEncoder` runs `ffmpeg`/`ffprobe` as subprocesses and maps
 * their exit status onto `EncoderError`.
 */

use async_trait::async_trait;
use log::{debug, error};
use std::fmt::Debug;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::EncoderConfig;
use crate::errors::EncoderError;

/// Runs encoder invocations described by argument lists
#[async_trait]
pub trait MediaEncoder: Send + Sync + Debug {
    /// Run the encoder with `args`; the last argument is the output path
    async fn encode(&self, args: &[String]) -> Result<(), EncoderError>;

    /// Duration of a media file in seconds
    async fn media_duration(&self, path: &Path) -> Result<f64, EncoderError>;
}

/// ffmpeg/ffprobe subprocess encoder
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    /// Create an encoder using the given executables
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Create an encoder from the encoder section of the configuration
    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(
            &config.ffmpeg_path,
            &config.ffprobe_path,
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<Output, EncoderError> {
        debug!("Running {} {}", program, args.join(" "));

        let future = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let result = match self.timeout {
            Some(timeout) => tokio::select! {
                result = future => result,
                _ = tokio::time::sleep(timeout) => {
                    return Err(EncoderError::Timeout {
                        program: program.to_string(),
                        secs: timeout.as_secs(),
                    });
                }
            },
            None => future.await,
        };

        let output = result.map_err(|e| EncoderError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("{} failed: {}", program, filtered);
            return Err(EncoderError::NonZeroExit {
                program: program.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: filtered,
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn encode(&self, args: &[String]) -> Result<(), EncoderError> {
        self.run(&self.ffmpeg_path, args).await.map(|_| ())
    }

    async fn media_duration(&self, path: &Path) -> Result<f64, EncoderError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let output = self.run(&self.ffprobe_path, &args).await?;
        parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the single-value output of `ffprobe -show_entries format=duration`
pub fn parse_duration_output(stdout: &str) -> Result<f64, EncoderError> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| EncoderError::Duration(format!("unexpected duration '{}'", value)))
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "encoder",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Quote a path for use as a filter option value, e.g. `subtitles=<value>`.
///
/// The value is unescaped twice: the filtergraph parser strips the single
/// quotes, then the filter's option parser strips the backslashes.
pub fn escape_filter_path(path: &Path) -> String {
    let option_value = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('=', "\\=");
    format!("'{}'", option_value.replace('\'', "'\\''"))
}
