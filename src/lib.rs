/*!
 * # Stillcast - narrated videos from a single still image
 *
 * A Rust library that turns one still image and a piece of text into a
 * narrated MP4 video.
 *
 * ## Features
 *
 * - Caption the image with shadowed text near the bottom of the frame
 * - Generate an SRT subtitle track from plain text
 * - Synthesize narration through a speech service
 * - Assemble the video with ffmpeg in four stages:
 *   - image to video
 *   - background music
 *   - burned-in subtitles
 *   - narration mixed over the existing audio
 * - Later stages degrade gracefully: a failed stage keeps the previous result
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `captioner`: Image captioning and text rendering
 * - `subtitle_processor`: Subtitle generation, SRT reading and writing
 * - `narration`: Narration synthesis on top of a speech provider
 * - `providers`: Speech service clients:
 *   - `providers::google`: Google Translate TTS client
 *   - `providers::mock`: Deterministic in-process provider
 * - `encoder`: ffmpeg/ffprobe invocation
 * - `assembler`: The four-stage video assembly
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod captioner;
pub mod narration;
pub mod encoder;
pub mod assembler;
pub mod app_controller;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::{Config, DurationPolicy};
pub use app_controller::{Controller, PipelineReport};
pub use assembler::{AssemblyInputs, AssemblyReport, Stage, StageOutcome, VideoAssembler};
pub use captioner::{FontRenderer, ImageCaptioner, TextRenderer};
pub use encoder::{FfmpegEncoder, MediaEncoder};
pub use narration::NarrationSynthesizer;
pub use providers::SpeechProvider;
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use language_utils::{get_language_name, normalize_to_part1};
pub use errors::{AppError, CaptionError, ConfigError, EncoderError, SpeechError};
