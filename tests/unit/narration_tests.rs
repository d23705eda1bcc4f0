/*!
 * Tests for narration synthesis
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use stillcast::errors::SpeechError;
use stillcast::narration::NarrationSynthesizer;
use stillcast::providers::mock::{MockBehavior, MockSpeechProvider};
use crate::common;

/// Test the language is normalized for the provider
#[test]
fn test_new_withThreeLetterLanguage_shouldNormalizeToPart1() -> Result<()> {
    let synthesizer = NarrationSynthesizer::new(Arc::new(MockSpeechProvider::working()), "eng")?;
    assert_eq!(synthesizer.language(), "en");
    Ok(())
}

/// Test an unknown language is rejected up front
#[test]
fn test_new_withUnknownLanguage_shouldFail() {
    let result = NarrationSynthesizer::new(Arc::new(MockSpeechProvider::working()), "qq");
    assert!(result.is_err());
}

/// Test chunking follows word boundaries
#[test]
fn test_chunk_text_withSmallLimit_shouldSplitOnWords() -> Result<()> {
    let provider = Arc::new(MockSpeechProvider::new(MockBehavior::Working, 10));
    let synthesizer = NarrationSynthesizer::new(provider, "en")?;

    assert_eq!(synthesizer.chunk_text("hello world foo"), vec!["hello", "world foo"]);
    Ok(())
}

/// Test a word above the limit is cut into pieces
#[test]
fn test_chunk_text_withOversizedWord_shouldHardSplit() -> Result<()> {
    let provider = Arc::new(MockSpeechProvider::new(MockBehavior::Working, 10));
    let synthesizer = NarrationSynthesizer::new(provider, "en")?;

    let chunks = synthesizer.chunk_text("abcdefghijklmnopqrstuvwxyz ok");

    assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxyz ok"]);
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    Ok(())
}

/// Test audio of every chunk is written in order
#[tokio::test]
async fn test_synthesize_to_file_withWorkingProvider_shouldConcatenateChunks() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("audio").join("narration.mp3");
    let provider = Arc::new(MockSpeechProvider::new(MockBehavior::Working, 12));
    let synthesizer = NarrationSynthesizer::new(provider.clone(), "de")?;

    let written = synthesizer.synthesize_to_file("Guten Morgen liebe Leute", &output).await?;

    assert_eq!(written, output);
    assert_eq!(
        provider.requests(),
        vec![
            ("Guten Morgen".to_string(), "de".to_string()),
            ("liebe Leute".to_string(), "de".to_string()),
        ]
    );

    let mut expected = MockSpeechProvider::audio_for("Guten Morgen", "de");
    expected.extend(MockSpeechProvider::audio_for("liebe Leute", "de"));
    assert_eq!(fs::read(&output)?, expected);
    Ok(())
}

/// Test a provider failure propagates as a speech error and writes nothing
#[tokio::test]
async fn test_synthesize_to_file_withFailingProvider_shouldPropagateSpeechError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("narration.mp3");
    let synthesizer = NarrationSynthesizer::new(Arc::new(MockSpeechProvider::failing()), "en")?;

    let error = synthesizer
        .synthesize_to_file("Hello there", &output)
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<SpeechError>(),
        Some(SpeechError::RequestFailed(_))
    ));
    assert!(!output.exists());
    Ok(())
}

/// Test an empty response is an error
#[test]
fn test_synthesize_to_file_withEmptyAudio_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let synthesizer = NarrationSynthesizer::new(Arc::new(MockSpeechProvider::empty()), "en")?;

    let result = tokio_test::block_on(async {
        synthesizer
            .synthesize_to_file("Hello", temp_dir.path().join("narration.mp3"))
            .await
    });
    let error = result.unwrap_err();

    assert!(matches!(error.downcast_ref::<SpeechError>(), Some(SpeechError::EmptyAudio)));
    Ok(())
}

/// Test blank text never reaches the provider
#[tokio::test]
async fn test_synthesize_to_file_withBlankText_shouldFailWithoutRequests() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = Arc::new(MockSpeechProvider::working());
    let synthesizer = NarrationSynthesizer::new(provider.clone(), "en")?;

    let error = synthesizer
        .synthesize_to_file("   ", temp_dir.path().join("narration.mp3"))
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<SpeechError>(), Some(SpeechError::EmptyText)));
    assert!(provider.requests().is_empty());
    Ok(())
}
