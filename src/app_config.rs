use anyhow::Result;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::language_utils;

/// Application configuration module
/// This module handles loading, prompting for missing values and validating
/// the pipeline settings. The resulting `Config` is built once and handed to
/// each component by reference; nothing mutates it afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source image path
    #[serde(default)]
    pub image: String,

    /// Caption text drawn onto the image
    #[serde(default)]
    pub text: String,

    /// Background music path
    #[serde(default)]
    pub music: Option<String>,

    /// Subtitle content; falls back to `text`
    #[serde(default)]
    pub subtitles: Option<String>,

    /// Video length in seconds
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Final video path
    #[serde(default = "default_output_video")]
    pub output_video: PathBuf,

    /// Directory receiving every generated artifact
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// TrueType/OpenType font used for the caption
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    /// Caption font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Vertical caption position as a fraction of image height
    #[serde(default = "default_caption_position")]
    pub caption_position: f32,

    /// Maximum characters per subtitle line
    #[serde(default = "default_subtitle_max_width")]
    pub subtitle_max_width: usize,

    /// Seconds each subtitle line stays on screen
    #[serde(default = "default_subtitle_line_duration")]
    pub subtitle_line_duration: f64,

    /// Narration language code (ISO 639-1 or 639-2)
    #[serde(default = "default_narration_language")]
    pub narration_language: String,

    /// Narration text; falls back to the subtitle text
    #[serde(default)]
    pub narration_text: Option<String>,

    /// How the video length reacts to the narration length
    #[serde(default)]
    pub duration_policy: DurationPolicy,

    /// External encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Speech service settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Reconciliation between narration length and video length
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Keep the configured duration; the shortest mix trims the narration
    #[default]
    Fixed,
    /// Lengthen the still so the whole narration fits
    ExtendToNarration,
}

/// External encoder configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncoderConfig {
    /// ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// ffprobe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Output height cap in pixels
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Per-invocation timeout; unset means wait for the process to exit
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            max_height: default_max_height(),
            timeout_secs: None,
        }
    }
}

/// Speech service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Service endpoint URL
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum characters sent per request
    #[serde(default = "default_speech_max_chars")]
    pub max_chars_per_request: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            timeout_secs: default_speech_timeout_secs(),
            max_chars_per_request: default_speech_max_chars(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for LevelFilter {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_duration() -> u64 {
    7
}

fn default_output_video() -> PathBuf {
    PathBuf::from("output/final_video.mp4")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Default caption font; a copy is bundled into the binary
pub const DEFAULT_FONT_PATH: &str = "assets/fonts/DejaVuSans-Bold.ttf";

fn default_font_path() -> PathBuf {
    PathBuf::from(DEFAULT_FONT_PATH)
}

fn default_font_size() -> f32 {
    140.0
}

fn default_caption_position() -> f32 {
    0.85
}

fn default_subtitle_max_width() -> usize {
    40
}

fn default_subtitle_line_duration() -> f64 {
    2.0
}

fn default_narration_language() -> String {
    "en".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_max_height() -> u32 {
    720
}

fn default_speech_endpoint() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_speech_timeout_secs() -> u64 {
    30
}

fn default_speech_max_chars() -> usize {
    // The translate_tts endpoint rejects longer inputs
    100
}

impl Config {
    /// Load a configuration file. A missing or malformed file is an error;
    /// no default file is written implicitly.
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Fill empty required keys (`image`, `text`) through `prompt`.
    ///
    /// The prompt receives the key name and returns the user's answer. A key
    /// that is still empty afterwards is reported as missing.
    pub fn resolve_required<F>(mut self, mut prompt: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> Result<String>,
    {
        if self.image.trim().is_empty() {
            self.image = prompt("image")?.trim().to_string();
        }
        if self.image.trim().is_empty() {
            return Err(ConfigError::MissingKey("image").into());
        }

        if self.text.trim().is_empty() {
            self.text = prompt("text")?.trim().to_string();
        }
        if self.text.trim().is_empty() {
            return Err(ConfigError::MissingKey("text").into());
        }

        Ok(self)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::MissingKey("image"));
        }
        if self.text.trim().is_empty() {
            return Err(ConfigError::MissingKey("text"));
        }
        if self.duration == 0 {
            return Err(ConfigError::InvalidValue {
                key: "duration",
                message: "must be at least 1 second".to_string(),
            });
        }
        if self.font_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "font_size",
                message: format!("must be positive, got {}", self.font_size),
            });
        }
        if !(0.0..1.0).contains(&self.caption_position) {
            return Err(ConfigError::InvalidValue {
                key: "caption_position",
                message: format!("must be within [0, 1), got {}", self.caption_position),
            });
        }
        if self.subtitle_max_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "subtitle_max_width",
                message: "must be at least 1 character".to_string(),
            });
        }
        if self.subtitle_line_duration <= 0.0 || !self.subtitle_line_duration.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "subtitle_line_duration",
                message: format!("must be a positive number, got {}", self.subtitle_line_duration),
            });
        }
        if self.encoder.max_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.max_height",
                message: "must be positive".to_string(),
            });
        }
        if self.speech.max_chars_per_request == 0 {
            return Err(ConfigError::InvalidValue {
                key: "speech.max_chars_per_request",
                message: "must be positive".to_string(),
            });
        }
        language_utils::normalize_to_part1(&self.narration_language).map_err(|e| {
            ConfigError::InvalidValue {
                key: "narration_language",
                message: e.to_string(),
            }
        })?;

        Ok(())
    }

    /// Background music path, if one is configured
    pub fn music_path(&self) -> Option<PathBuf> {
        self.music
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(PathBuf::from)
    }

    /// Text rendered as subtitles
    pub fn subtitle_text(&self) -> &str {
        match self.subtitles.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => self.text.trim(),
        }
    }

    /// Text spoken by the narration
    pub fn narration_text(&self) -> &str {
        match self.narration_text.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => self.subtitle_text(),
        }
    }

    /// Subtitle line duration in whole milliseconds
    pub fn subtitle_line_duration_ms(&self) -> u64 {
        (self.subtitle_line_duration * 1000.0).round() as u64
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            image: String::new(),
            text: String::new(),
            music: None,
            subtitles: None,
            duration: default_duration(),
            output_video: default_output_video(),
            output_dir: default_output_dir(),
            font_path: default_font_path(),
            font_size: default_font_size(),
            caption_position: default_caption_position(),
            subtitle_max_width: default_subtitle_max_width(),
            subtitle_line_duration: default_subtitle_line_duration(),
            narration_language: default_narration_language(),
            narration_text: None,
            duration_policy: DurationPolicy::default(),
            encoder: EncoderConfig::default(),
            speech: SpeechConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
