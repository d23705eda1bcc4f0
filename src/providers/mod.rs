/*!
 * Speech synthesis providers.
 *
 * This module contains client implementations for text-to-speech services:
 * - Google Translate TTS: the public `translate_tts` endpoint
 * - Mock: deterministic in-process provider for tests and dry runs
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::errors::SpeechError;

/// Common trait for all speech providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the narration synthesizer.
#[async_trait]
pub trait SpeechProvider: Send + Sync + Debug {
    /// Synthesize one chunk of text
    ///
    /// # Arguments
    /// * `text` - Text no longer than `max_chars_per_request()`
    /// * `language` - ISO 639-1 language code
    ///
    /// # Returns
    /// * `Result<Bytes, SpeechError>` - Encoded audio (MP3) or an error
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, SpeechError>;

    /// Largest chunk the provider accepts in one request
    fn max_chars_per_request(&self) -> usize;

    /// Display name used in logs
    fn name(&self) -> &'static str;
}

pub mod google;
pub mod mock;
