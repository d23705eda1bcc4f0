/*!
 * Video assembly.
 *
 * Four encoder stages run in a fixed order, each consuming the artifact of
 * the previous one:
 *
 * 1. image → video (required; failure aborts assembly)
 * 2. + background music
 * 3. + burned-in subtitles
 * 4. + narration mixed over the existing audio
 *
 * Stages 2–4 are optional. A stage whose input is absent is skipped; a stage
 * whose invocation fails leaves the previous artifact as the current one.
 * Intermediate files are owned by `IntermediateArtifact` guards, so a
 * superseded or failed artifact is removed however the assembly ends.
 */

use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::encoder::{MediaEncoder, escape_filter_path};
use crate::errors::EncoderError;
use crate::file_utils::FileManager;

/// Gain applied to the narration in the final mix
pub const NARRATION_GAIN: f32 = 1.3;

/// Gain applied to the existing audio track in the final mix
pub const BACKGROUND_GAIN: f32 = 0.4;

/// Assembly stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ImageToVideo,
    Music,
    Subtitles,
    Narration,
}

impl Stage {
    /// Suffix used for the stage's output file
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ImageToVideo => "base",
            Self::Music => "music",
            Self::Subtitles => "subtitled",
            Self::Narration => "narrated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ImageToVideo => "image to video",
            Self::Music => "background music",
            Self::Subtitles => "subtitles",
            Self::Narration => "narration",
        };
        write!(f, "{}", name)
    }
}

/// Result of one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The stage produced this artifact
    Completed(PathBuf),
    /// The stage had nothing to do
    Skipped(String),
    /// The stage ran and failed; the previous artifact was kept
    Failed(String),
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Stage and its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Summary of an assembly run
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    /// Best artifact reached
    pub final_path: PathBuf,
    /// One record per stage, in execution order
    pub stages: Vec<StageRecord>,
}

impl AssemblyReport {
    /// Outcome of `stage`, if it was recorded
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| &r.outcome)
    }
}

/// Inputs of an assembly run
#[derive(Debug, Clone)]
pub struct AssemblyInputs {
    /// Still image looped into the video
    pub image: PathBuf,
    /// Background music
    pub music: Option<PathBuf>,
    /// SRT file to burn in
    pub subtitles: Option<PathBuf>,
    /// Narration audio
    pub narration: Option<PathBuf>,
    /// Video length in seconds
    pub duration_secs: u64,
}

/// Owned intermediate file, removed on drop unless persisted
#[derive(Debug)]
pub struct IntermediateArtifact {
    path: PathBuf,
    armed: bool,
}

impl IntermediateArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and hand its path to the caller
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for IntermediateArtifact {
    fn drop(&mut self) {
        if !self.armed || !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed intermediate {}", self.path.display()),
            Err(e) => warn!("Could not remove intermediate {}: {}", self.path.display(), e),
        }
    }
}

/// Replace `current` with the artifact at `next_path`, removing the old file
/// unless both name the same file.
fn advance(current: IntermediateArtifact, next_path: PathBuf) -> IntermediateArtifact {
    if FileManager::same_file(current.path(), &next_path) {
        current.persist();
    }
    IntermediateArtifact::new(next_path)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Arguments looping `image` into a `duration_secs` long H.264 video capped at
/// `max_height` pixels, with even dimensions and yuv420p for player support.
pub fn image_to_video_args(image: &Path, duration_secs: u64, max_height: u32, output: &Path) -> Vec<String> {
    let scale = format!("scale=-2:'2*trunc(min({},ih)/2)'", max_height);
    let duration = duration_secs.to_string();
    to_args(&[
        "-y",
        "-loop", "1",
        "-i", &path_arg(image),
        "-t", &duration,
        "-vf", &scale,
        "-c:v", "libx264",
        "-tune", "stillimage",
        "-r", "25",
        "-pix_fmt", "yuv420p",
        &path_arg(output),
    ])
}

/// Arguments adding `music` as the audio track; video copied, output cut to
/// the shorter stream.
pub fn music_args(video: &Path, music: &Path, output: &Path) -> Vec<String> {
    to_args(&[
        "-y",
        "-i", &path_arg(video),
        "-i", &path_arg(music),
        "-map", "0:v:0",
        "-map", "1:a:0",
        "-c:v", "copy",
        "-c:a", "aac",
        "-shortest",
        &path_arg(output),
    ])
}

/// Arguments burning `subtitles` into the video. Filtering needs a video
/// re-encode; audio is copied.
pub fn subtitles_args(video: &Path, subtitles: &Path, output: &Path) -> Vec<String> {
    let filter = format!("subtitles={}", escape_filter_path(subtitles));
    to_args(&[
        "-y",
        "-i", &path_arg(video),
        "-vf", &filter,
        "-c:v", "libx264",
        "-pix_fmt", "yuv420p",
        "-c:a", "copy",
        &path_arg(output),
    ])
}

/// Filter graph for the narration stage
pub fn narration_filter(video_has_audio: bool) -> String {
    if video_has_audio {
        format!(
            "[0:a]volume={}[bg];[1:a]volume={}[narr];[bg][narr]amix=inputs=2:duration=shortest[aout]",
            BACKGROUND_GAIN, NARRATION_GAIN
        )
    } else {
        format!("[1:a]volume={}[aout]", NARRATION_GAIN)
    }
}

/// Arguments mixing `narration` into the audio; video copied.
pub fn narration_args(video: &Path, narration: &Path, video_has_audio: bool, output: &Path) -> Vec<String> {
    let filter = narration_filter(video_has_audio);
    to_args(&[
        "-y",
        "-i", &path_arg(video),
        "-i", &path_arg(narration),
        "-filter_complex", &filter,
        "-map", "0:v:0",
        "-map", "[aout]",
        "-c:v", "copy",
        "-c:a", "aac",
        &path_arg(output),
    ])
}

/// Runs the four assembly stages through a `MediaEncoder`
#[derive(Debug)]
pub struct VideoAssembler {
    encoder: Arc<dyn MediaEncoder>,
    /// Stage outputs are siblings of this path, tagged per stage
    base_path: PathBuf,
    max_height: u32,
}

impl VideoAssembler {
    pub fn new(encoder: Arc<dyn MediaEncoder>, base_path: PathBuf, max_height: u32) -> Self {
        Self {
            encoder,
            base_path,
            max_height,
        }
    }

    /// Output path of `stage`
    pub fn stage_path(&self, stage: Stage) -> PathBuf {
        FileManager::tagged_path(&self.base_path, stage.tag(), "mp4")
    }

    /// Run the encoder and confirm the output exists. A leftover file from an
    /// earlier run is removed first so it cannot pass for fresh output; a
    /// partial output of a failed run is removed afterwards.
    async fn run_stage(&self, args: &[String], output: &Path) -> Result<(), EncoderError> {
        if output.exists() {
            fs::remove_file(output).map_err(|e| EncoderError::Spawn {
                program: "cleanup".to_string(),
                message: format!("cannot remove stale {}: {}", output.display(), e),
            })?;
        }

        let result = match self.encoder.encode(args).await {
            Ok(()) if output.is_file() => Ok(()),
            Ok(()) => Err(EncoderError::MissingOutput(output.to_path_buf())),
            Err(e) => Err(e),
        };

        if result.is_err() {
            drop(IntermediateArtifact::new(output.to_path_buf()));
        }
        result
    }

    /// Run one optional stage. Returns the outcome and, on success, the new
    /// current artifact; otherwise `current` is handed back untouched.
    async fn optional_stage(
        &self,
        stage: Stage,
        input: Option<&Path>,
        current: IntermediateArtifact,
        build_args: impl FnOnce(&Path, &Path, &Path) -> Vec<String>,
    ) -> (StageOutcome, IntermediateArtifact) {
        let input = match input {
            None => {
                debug!("Skipping {}: nothing supplied", stage);
                return (StageOutcome::Skipped("not supplied".to_string()), current);
            }
            Some(path) if !path.is_file() => {
                warn!("Skipping {}: {} does not exist", stage, path.display());
                return (
                    StageOutcome::Skipped(format!("{} does not exist", path.display())),
                    current,
                );
            }
            Some(path) => path,
        };

        let output = self.stage_path(stage);
        let args = build_args(current.path(), input, &output);

        match self.run_stage(&args, &output).await {
            Ok(()) => {
                info!("Stage {} complete: {}", stage, output.display());
                (StageOutcome::Completed(output.clone()), advance(current, output))
            }
            Err(e) => {
                warn!("Stage {} failed, keeping {}: {}", stage, current.path().display(), e);
                (StageOutcome::Failed(e.to_string()), current)
            }
        }
    }

    /// Assemble the video. Only a Stage 1 failure is an error; afterwards the
    /// best artifact reached is returned.
    pub async fn assemble(&self, inputs: &AssemblyInputs) -> Result<AssemblyReport, EncoderError> {
        let mut stages = Vec::with_capacity(4);

        let base_output = self.stage_path(Stage::ImageToVideo);
        FileManager::ensure_parent_dir(&base_output).map_err(|e| EncoderError::Spawn {
            program: "mkdir".to_string(),
            message: e.to_string(),
        })?;

        let args = image_to_video_args(&inputs.image, inputs.duration_secs, self.max_height, &base_output);
        self.run_stage(&args, &base_output).await?;
        info!("Stage {} complete: {}", Stage::ImageToVideo, base_output.display());
        stages.push(StageRecord {
            stage: Stage::ImageToVideo,
            outcome: StageOutcome::Completed(base_output.clone()),
        });
        let current = IntermediateArtifact::new(base_output);

        let (outcome, current) = self
            .optional_stage(Stage::Music, inputs.music.as_deref(), current, music_args)
            .await;
        let has_audio = outcome.is_completed();
        stages.push(StageRecord { stage: Stage::Music, outcome });

        let (outcome, current) = self
            .optional_stage(Stage::Subtitles, inputs.subtitles.as_deref(), current, subtitles_args)
            .await;
        stages.push(StageRecord { stage: Stage::Subtitles, outcome });

        let (outcome, current) = self
            .optional_stage(
                Stage::Narration,
                inputs.narration.as_deref(),
                current,
                |video, narration, output| narration_args(video, narration, has_audio, output),
            )
            .await;
        stages.push(StageRecord { stage: Stage::Narration, outcome });

        Ok(AssemblyReport {
            final_path: current.persist(),
            stages,
        })
    }
}
