use std::time::Duration;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use log::{debug, error};
use url::Url;

use crate::app_config::SpeechConfig;
use crate::errors::SpeechError;
use crate::providers::SpeechProvider;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Client for the Google Translate text-to-speech endpoint
#[derive(Debug)]
pub struct GoogleTranslateTts {
    /// HTTP client for API requests
    client: Client,
    /// Endpoint URL
    endpoint: String,
    /// Maximum characters per request
    max_chars_per_request: usize,
}

impl GoogleTranslateTts {
    /// Create a new client
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64, max_chars_per_request: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            max_chars_per_request,
        }
    }

    /// Create a client from the speech section of the configuration
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(&config.endpoint, config.timeout_secs, config.max_chars_per_request)
    }

    /// Build the request URL for one chunk
    pub fn request_url(&self, text: &str, language: &str) -> Result<Url, SpeechError> {
        let text_len = text.chars().count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", language),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", text_len.as_str()),
                ("client", "tw-ob"),
            ],
        )
        .map_err(|e| SpeechError::RequestFailed(format!("invalid endpoint {}: {}", self.endpoint, e)))
    }
}

#[async_trait]
impl SpeechProvider for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, SpeechError> {
        let url = self.request_url(text, language)?;
        debug!("Requesting {} chars of speech ({})", text.chars().count(), language);

        let response = self.client.get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::REFERER, "https://translate.google.com/")
            .send()
            .await
            .map_err(|e| SpeechError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Speech service error ({}): {}", status, error_text);
            return Err(SpeechError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let audio = response.bytes().await
            .map_err(|e| SpeechError::RequestFailed(format!("failed to read audio body: {}", e)))?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        Ok(audio)
    }

    fn max_chars_per_request(&self) -> usize {
        self.max_chars_per_request
    }

    fn name(&self) -> &'static str {
        "Google Translate TTS"
    }
}
