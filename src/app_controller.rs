use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, DurationPolicy};
use crate::assembler::{AssemblyInputs, AssemblyReport, StageOutcome, VideoAssembler};
use crate::captioner::{FontRenderer, ImageCaptioner, TextRenderer};
use crate::encoder::{FfmpegEncoder, MediaEncoder};
use crate::errors::{AppError, CaptionError, EncoderError};
use crate::file_utils::FileManager;
use crate::narration::NarrationSynthesizer;
use crate::providers::SpeechProvider;
use crate::providers::google::GoogleTranslateTts;
use crate::subtitle_processor::SubtitleCollection;

// @module: Application controller for the still-to-video pipeline

/// File name of the generated subtitle track inside the output directory
pub const SUBTITLES_FILE: &str = "subtitles.srt";

/// File name of the narration inside the output directory
pub const NARRATION_FILE: &str = "narration.mp3";

const PIPELINE_STEPS: u64 = 4;

/// Artifacts produced by a full pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Captioned image
    pub processed_image: PathBuf,
    /// Generated subtitle track
    pub subtitles: PathBuf,
    /// Narration audio, absent when synthesis failed
    pub narration: Option<PathBuf>,
    /// Final video at the configured output path
    pub video: PathBuf,
    /// Per-stage assembly outcomes
    pub assembly: AssemblyReport,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration, immutable for the controller's lifetime
    config: Config,
    // @field: Speech service
    speech: Arc<dyn SpeechProvider>,
    // @field: External encoder
    encoder: Arc<dyn MediaEncoder>,
    // @field: Caption renderer, loaded from the font asset on first use
    renderer: Option<Box<dyn TextRenderer + Send>>,
    // @field: Whether to draw a progress bar
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the production collaborators
    pub fn with_config(config: Config) -> Result<Self> {
        let speech = Arc::new(GoogleTranslateTts::from_config(&config.speech));
        let encoder = Arc::new(FfmpegEncoder::from_config(&config.encoder));

        Ok(Self {
            config,
            speech,
            encoder,
            renderer: None,
            show_progress: true,
        })
    }

    /// Replace the speech provider
    pub fn with_speech_provider(mut self, speech: Arc<dyn SpeechProvider>) -> Self {
        self.speech = speech;
        self
    }

    /// Replace the encoder
    pub fn with_encoder(mut self, encoder: Arc<dyn MediaEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Replace the caption renderer
    pub fn with_text_renderer(mut self, renderer: Box<dyn TextRenderer + Send>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Path of the generated subtitle track
    pub fn subtitles_path(&self) -> PathBuf {
        self.config.output_dir.join(SUBTITLES_FILE)
    }

    /// Path of the narration audio
    pub fn narration_path(&self) -> PathBuf {
        self.config.output_dir.join(NARRATION_FILE)
    }

    /// Stage outputs live in the output directory, named after the final video
    fn stage_base_path(&self) -> PathBuf {
        let file_name = self
            .config
            .output_video
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("final_video.mp4"));
        self.config.output_dir.join(file_name)
    }

    /// Caption the configured image
    pub fn caption_image(&mut self) -> Result<PathBuf, CaptionError> {
        let renderer: Box<dyn TextRenderer + Send> = match self.renderer.take() {
            Some(renderer) => renderer,
            None => Box::new(FontRenderer::from_config(&self.config)?),
        };

        let mut captioner = ImageCaptioner::new(
            renderer,
            self.config.caption_position,
            self.config.output_dir.clone(),
        );
        let result = captioner.caption(&self.config.image, self.config.text.trim());

        // Keep the renderer and its glyph cache for the next call
        self.renderer = Some(captioner.into_renderer());

        result
    }

    /// Generate the subtitle track
    pub fn generate_subtitles(&self) -> Result<SubtitleCollection> {
        let path = self.subtitles_path();
        let collection = SubtitleCollection::generate(
            self.config.subtitle_text(),
            self.config.subtitle_max_width,
            self.config.subtitle_line_duration_ms(),
            &path,
        )?;
        info!("Subtitle file generated: {}", path.display());
        Ok(collection)
    }

    /// Synthesize the narration
    pub async fn synthesize_narration(&self) -> Result<PathBuf> {
        let synthesizer = NarrationSynthesizer::new(self.speech.clone(), &self.config.narration_language)?;
        synthesizer
            .synthesize_to_file(self.config.narration_text(), self.narration_path())
            .await
    }

    /// Video length, lengthened to fit the narration when the policy asks for it
    pub async fn video_duration(&self, narration: Option<&PathBuf>) -> u64 {
        let configured = self.config.duration;
        let narration = match (self.config.duration_policy, narration) {
            (DurationPolicy::ExtendToNarration, Some(path)) => path,
            _ => return configured,
        };

        match self.encoder.media_duration(narration).await {
            Ok(secs) => {
                let needed = secs.ceil() as u64;
                if needed > configured {
                    info!("Extending video from {}s to {}s to fit the narration", configured, needed);
                }
                configured.max(needed)
            }
            Err(e) => {
                warn!("Could not measure narration, keeping {}s: {}", configured, e);
                configured
            }
        }
    }

    /// Assemble the video from already generated artifacts
    pub async fn assemble_video(
        &self,
        image: PathBuf,
        subtitles: Option<PathBuf>,
        narration: Option<PathBuf>,
    ) -> Result<AssemblyReport, EncoderError> {
        let duration_secs = self.video_duration(narration.as_ref()).await;
        let inputs = AssemblyInputs {
            image,
            music: self.config.music_path(),
            subtitles,
            narration,
            duration_secs,
        };

        let assembler = VideoAssembler::new(
            self.encoder.clone(),
            self.stage_base_path(),
            self.config.encoder.max_height,
        );

        assembler.assemble(&inputs).await
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(PIPELINE_STEPS);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Run the whole pipeline: caption → subtitles → narration → assembly.
    ///
    /// A narration failure is logged and the video is assembled without it;
    /// every other failure aborts the run.
    pub async fn run(&mut self) -> Result<PipelineReport, AppError> {
        let start_time = Instant::now();
        FileManager::ensure_dir(&self.config.output_dir)?;

        let progress_bar = self.progress_bar();

        progress_bar.set_message("Captioning image");
        let processed_image = self
            .caption_image()
            .map_err(|e| Self::abandon(&progress_bar, "Captioning failed", e.into()))?;
        progress_bar.inc(1);

        progress_bar.set_message("Generating subtitles");
        self.generate_subtitles()
            .map_err(|e| Self::abandon(&progress_bar, "Subtitle generation failed", e.into()))?;
        let subtitles = self.subtitles_path();
        progress_bar.inc(1);

        progress_bar.set_message("Synthesizing narration");
        let narration = match self.synthesize_narration().await {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Narration unavailable, continuing without it: {:#}", e);
                None
            }
        };
        progress_bar.inc(1);

        progress_bar.set_message("Assembling video");
        let assembly = self
            .assemble_video(processed_image.clone(), Some(subtitles.clone()), narration.clone())
            .await
            .map_err(|e| Self::abandon(&progress_bar, "Video creation failed", e.into()))?;
        progress_bar.inc(1);

        let video = self.config.output_video.clone();
        if !FileManager::same_file(&assembly.final_path, &video) {
            FileManager::move_file(&assembly.final_path, &video)
                .map_err(|e| Self::abandon(&progress_bar, "Moving the final video failed", e.into()))?;
        }
        progress_bar.finish_with_message("Done");

        for record in &assembly.stages {
            if let StageOutcome::Failed(reason) = &record.outcome {
                warn!("Stage {} did not apply: {}", record.stage, reason);
            }
        }

        let elapsed = start_time.elapsed();
        info!(
            "Final video created: {} ({})",
            video.display(),
            Self::format_duration(elapsed)
        );

        Ok(PipelineReport {
            processed_image,
            subtitles,
            narration,
            video,
            assembly,
            elapsed,
        })
    }

    // @returns: `error` after leaving the bar stopped at the failing step
    fn abandon(progress_bar: &ProgressBar, message: &'static str, error: AppError) -> AppError {
        progress_bar.abandon_with_message(message);
        error!("{}: {}", message, error);
        error
    }

    /// Format a duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
