/*!
 * Error types for the stillcast application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file could not be parsed
    #[error("Failed to parse config file {path}: {message}")]
    Malformed {
        /// Path of the offending file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A required key is missing and could not be prompted for
    #[error("Missing required config key: {0}")]
    MissingKey(&'static str),

    /// A value is outside of its accepted range
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Config key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Errors that can occur when talking to a speech synthesis service
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Error when making an API request fails
    #[error("Speech request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the service itself
    #[error("Speech service responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error body from the service
        message: String,
    },

    /// The service returned no audio
    #[error("Speech service returned an empty response")]
    EmptyAudio,

    /// Nothing to synthesize
    #[error("Narration text is empty")]
    EmptyText,
}

/// Errors that can occur when invoking the external encoder
#[derive(Error, Debug)]
pub enum EncoderError {
    /// The encoder binary could not be spawned
    #[error("Failed to execute {program}: {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// OS error message
        message: String,
    },

    /// The encoder exited with a non-zero status
    #[error("{program} exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Program name
        program: String,
        /// Exit code, -1 when killed by a signal
        status: i32,
        /// Filtered stderr output
        stderr: String,
    },

    /// The encoder ran past the configured timeout
    #[error("{program} timed out after {secs} seconds")]
    Timeout {
        /// Program name
        program: String,
        /// Timeout that was exceeded
        secs: u64,
    },

    /// The encoder reported success but the output file is absent
    #[error("Expected output was not produced: {0}")]
    MissingOutput(PathBuf),

    /// ffprobe output could not be interpreted
    #[error("Failed to read media duration: {0}")]
    Duration(String),
}

/// Errors that can occur while captioning an image
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The source image does not exist
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    /// The image could not be decoded or encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The font asset could not be loaded
    #[error("Font error: {0}")]
    Font(String),

    /// The output directory or file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration handling
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Error from speech synthesis
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Error from the encoder
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// Error from the captioner
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
