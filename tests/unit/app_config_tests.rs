/*!
 * Tests for application configuration
 */

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use stillcast::app_config::{Config, DurationPolicy, LogLevel};
use stillcast::errors::ConfigError;
use crate::common;

/// Test a missing config file is an error, not a silent default
#[test]
fn test_load_withMissingFile_shouldReturnNotFound() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = Config::load(temp_dir.path().join("conf.json"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
    Ok(())
}

/// Test malformed JSON
#[test]
fn test_load_withMalformedJson_shouldReturnMalformed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ \"image\": ")?;
    assert!(matches!(Config::load(&path), Err(ConfigError::Malformed { .. })));
    Ok(())
}

/// Test the minimal config picks up defaults for every optional key
#[test]
fn test_load_withMinimalConfig_shouldApplyDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "image": "photo.jpg", "text": "Hello" }"#,
    )?;

    let config = Config::load(&path)?;

    assert_eq!(config.image, "photo.jpg");
    assert_eq!(config.text, "Hello");
    assert_eq!(config.music, None);
    assert_eq!(config.subtitles, None);
    assert_eq!(config.duration, 7);
    assert_eq!(config.output_video, PathBuf::from("output/final_video.mp4"));
    assert_eq!(config.output_dir, PathBuf::from("output"));
    assert_eq!(config.duration_policy, DurationPolicy::Fixed);
    assert_eq!(config.narration_language, "en");
    assert_eq!(config.encoder.max_height, 720);
    assert_eq!(config.encoder.timeout_secs, None);
    assert_eq!(config.speech.max_chars_per_request, 100);
    assert_eq!(config.log_level, LogLevel::Info);
    config.validate()?;
    Ok(())
}

/// Test every documented key is read
#[test]
fn test_load_withFullConfig_shouldReadAllKeys() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "image": "photo.jpg",
            "text": "Caption",
            "music": "music.mp3",
            "subtitles": "Subtitle text",
            "duration": 12,
            "output_video": "out/video.mp4",
            "narration_language": "fra",
            "narration_text": "Bonjour",
            "duration_policy": "extend_to_narration",
            "encoder": { "ffmpeg_path": "/opt/ffmpeg", "timeout_secs": 600 },
            "speech": { "timeout_secs": 5 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load(&path)?;

    assert_eq!(config.music_path(), Some(PathBuf::from("music.mp3")));
    assert_eq!(config.duration, 12);
    assert_eq!(config.output_video, PathBuf::from("out/video.mp4"));
    assert_eq!(config.duration_policy, DurationPolicy::ExtendToNarration);
    assert_eq!(config.encoder.ffmpeg_path, "/opt/ffmpeg");
    assert_eq!(config.encoder.ffprobe_path, "ffprobe");
    assert_eq!(config.encoder.timeout_secs, Some(600));
    assert_eq!(config.speech.timeout_secs, 5);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.subtitle_text(), "Subtitle text");
    assert_eq!(config.narration_text(), "Bonjour");
    config.validate()?;
    Ok(())
}

/// Test the default config written by `init` loads back
#[test]
fn test_default_config_withSerialization_shouldLoadBack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let json = serde_json::to_string_pretty(&Config::default())?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", &json)?;

    let config = Config::load(&path)?;

    assert!(config.image.is_empty());
    assert_eq!(config.font_size, 140.0);
    assert_eq!(config.caption_position, 0.85);
    Ok(())
}

/// Test prompting only happens for missing keys
#[test]
fn test_resolve_required_withMissingText_shouldPromptOnce() -> Result<()> {
    let config = Config {
        image: "photo.jpg".to_string(),
        ..Config::default()
    };
    let mut asked = Vec::new();

    let config = config.resolve_required(|key| {
        asked.push(key);
        Ok("  Typed caption ".to_string())
    })?;

    assert_eq!(asked, vec!["text"]);
    assert_eq!(config.text, "Typed caption");
    Ok(())
}

/// Test nothing is asked when both keys are present
#[test]
fn test_resolve_required_withCompleteConfig_shouldNotPrompt() -> Result<()> {
    let config = Config {
        image: "photo.jpg".to_string(),
        text: "Hello".to_string(),
        ..Config::default()
    };

    let config = config.resolve_required(|key| Err(anyhow!("unexpected prompt for {}", key)))?;

    assert_eq!(config.text, "Hello");
    Ok(())
}

/// Test an empty answer is a missing key
#[test]
fn test_resolve_required_withEmptyAnswer_shouldReturnMissingKey() {
    let result = Config::default().resolve_required(|_| Ok(String::new()));

    let error = result.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingKey("image"))
    ));
}

fn valid_config() -> Config {
    Config {
        image: "photo.jpg".to_string(),
        text: "Hello".to_string(),
        ..Config::default()
    }
}

/// Test range validation
#[test]
fn test_validate_withOutOfRangeValues_shouldNameTheKey() {
    let cases: Vec<(Config, &str)> = vec![
        (Config { duration: 0, ..valid_config() }, "duration"),
        (Config { font_size: 0.0, ..valid_config() }, "font_size"),
        (Config { caption_position: 1.0, ..valid_config() }, "caption_position"),
        (Config { subtitle_max_width: 0, ..valid_config() }, "subtitle_max_width"),
        (Config { subtitle_line_duration: -1.0, ..valid_config() }, "subtitle_line_duration"),
        (Config { narration_language: "qq".to_string(), ..valid_config() }, "narration_language"),
    ];

    for (config, expected_key) in cases {
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected invalid {}, got {:?}", expected_key, other),
        }
    }
}

/// Test a language the speech service cannot take is rejected up front
#[test]
fn test_validate_withLanguageWithoutTwoLetterCode_shouldRejectLanguage() {
    // Asturian has an ISO 639-3 code but no ISO 639-1 code
    let config = Config {
        narration_language: "ast".to_string(),
        ..valid_config()
    };

    match config.validate() {
        Err(ConfigError::InvalidValue { key, message }) => {
            assert_eq!(key, "narration_language");
            assert!(message.contains("ast"));
        }
        other => panic!("expected invalid narration_language, got {:?}", other),
    }

    let config = Config {
        narration_language: "deu".to_string(),
        ..valid_config()
    };
    assert!(config.validate().is_ok());
}

/// Test fallbacks between the text keys
#[test]
fn test_text_fallbacks_withOnlyCaption_shouldReuseCaption() {
    let config = Config {
        subtitles: Some("   ".to_string()),
        ..valid_config()
    };

    assert_eq!(config.subtitle_text(), "Hello");
    assert_eq!(config.narration_text(), "Hello");
}

/// Test an empty music entry means no music
#[test]
fn test_music_path_withEmptyString_shouldBeNone() {
    let config = Config {
        music: Some(String::new()),
        ..valid_config()
    };
    assert_eq!(config.music_path(), None);
}

/// Test line duration conversion
#[test]
fn test_subtitle_line_duration_ms_withFractionalSeconds_shouldRound() {
    let config = Config {
        subtitle_line_duration: 2.5,
        ..valid_config()
    };
    assert_eq!(config.subtitle_line_duration_ms(), 2500);
}
