/*!
 * Mock speech provider for testing.
 *
 * - `MockSpeechProvider::working()` - returns deterministic fake audio
 * - `MockSpeechProvider::failing()` - always fails as if the service were unreachable
 * - `MockSpeechProvider::empty()` - answers without audio
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use crate::errors::SpeechError;
use crate::providers::SpeechProvider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with a connection error
    Failing,
    /// Succeeds but returns no bytes
    Empty,
}

/// Mock provider recording every request it receives
#[derive(Debug)]
pub struct MockSpeechProvider {
    behavior: MockBehavior,
    max_chars_per_request: usize,
    requests: Mutex<Vec<(String, String)>>,
}

impl MockSpeechProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior, max_chars_per_request: usize) -> Self {
        Self {
            behavior,
            max_chars_per_request,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock provider
    pub fn working() -> Self {
        Self::new(MockBehavior::Working, 100)
    }

    /// Create a failing mock provider
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, 100)
    }

    /// Create a mock that answers with empty bodies
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty, 100)
    }

    /// Fake audio returned for `text`
    pub fn audio_for(text: &str, language: &str) -> Vec<u8> {
        format!("ID3[{}]{};", language, text).into_bytes()
    }

    /// Requests received so far as (text, language) pairs
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, SpeechError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((text.to_string(), language.to_string()));
        }

        match self.behavior {
            MockBehavior::Working => Ok(Bytes::from(Self::audio_for(text, language))),
            MockBehavior::Failing => Err(SpeechError::RequestFailed(
                "mock speech service unreachable".to_string(),
            )),
            MockBehavior::Empty => Err(SpeechError::EmptyAudio),
        }
    }

    fn max_chars_per_request(&self) -> usize {
        self.max_chars_per_request
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
