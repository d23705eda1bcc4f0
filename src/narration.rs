/*!
 * Narration synthesis.
 *
 * Splits the narration text into chunks the speech service accepts, requests
 * each chunk in order and writes the concatenated audio to disk. MP3 frames
 * concatenate cleanly, so no re-encoding is needed. Failures propagate; there
 * are no retries.
 */

use anyhow::{Context, Result};
use bytes::BytesMut;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::SpeechError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::SpeechProvider;
use crate::subtitle_processor::wrap_text;

/// Narration synthesizer bound to one provider and language
#[derive(Debug)]
pub struct NarrationSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    language: String,
}

impl NarrationSynthesizer {
    /// Create a synthesizer; the language is normalized to ISO 639-1
    pub fn new(provider: Arc<dyn SpeechProvider>, language: &str) -> Result<Self> {
        let language = language_utils::normalize_to_part1(language)
            .with_context(|| format!("Unsupported narration language: {}", language))?;
        Ok(Self { provider, language })
    }

    /// Language sent to the provider
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Split text into request-sized chunks on word boundaries
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        wrap_text(text, self.provider.max_chars_per_request())
    }

    /// Synthesize `text` and write the audio to `output_path`
    pub async fn synthesize_to_file<P: AsRef<Path>>(&self, text: &str, output_path: P) -> Result<PathBuf> {
        let output_path = output_path.as_ref();

        let chunks = self.chunk_text(text);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText.into());
        }

        let language_name = language_utils::get_language_name(&self.language)
            .unwrap_or_else(|_| self.language.clone());
        debug!(
            "Synthesizing {} narration with {} in {} request(s)",
            language_name,
            self.provider.name(),
            chunks.len()
        );

        let mut audio = BytesMut::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let part = self.provider.synthesize(chunk, &self.language).await
                .with_context(|| format!("Speech synthesis failed for chunk {}/{}", i + 1, chunks.len()))?;
            audio.extend_from_slice(&part);
        }

        FileManager::ensure_parent_dir(output_path)?;
        tokio::fs::write(output_path, &audio).await
            .with_context(|| format!("Failed to write narration: {}", output_path.display()))?;

        info!("Narration saved as: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }
}
