// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use dialoguer::Input;
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use stillcast::app_config::{Config, LogLevel};
use stillcast::app_controller::Controller;
use stillcast::assembler::StageOutcome;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the narrated video (default command)
    Run,

    /// Caption the image only
    Caption,

    /// Generate the subtitle track only
    Subtitles,

    /// Synthesize the narration only
    Narrate,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions for stillcast
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Stillcast - narrated videos from a single still image
///
/// Captions an image, generates subtitles and narration from text, and
/// assembles everything into an MP4 with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "stillcast")]
#[command(version = "0.1.0")]
#[command(about = "Turn a still image and some text into a narrated video")]
#[command(long_about = "Stillcast captions a still image, writes an SRT subtitle track and a spoken
narration for the given text, and assembles them into an MP4 video with ffmpeg.

EXAMPLES:
    stillcast                                   # Run the pipeline with conf.json
    stillcast -i photo.jpg -t \"Hello world\"     # Override image and text
    stillcast -m music.mp3 -d 12                # Add background music, 12s video
    stillcast caption                           # Only caption the image
    stillcast init                              # Write a default conf.json
    stillcast completions bash > stillcast.bash # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json by default. Use --config-path for a
    different file. A missing image or text is asked for interactively.

REQUIREMENTS:
    ffmpeg and ffprobe must be on the PATH, or configured under \"encoder\".")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Image to caption
    #[arg(short, long, global = true)]
    image: Option<String>,

    /// Caption text
    #[arg(short, long, global = true)]
    text: Option<String>,

    /// Background music file
    #[arg(short, long, global = true)]
    music: Option<String>,

    /// Final video path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Video length in seconds
    #[arg(short, long, global = true)]
    duration: Option<u64>,

    /// Disable the progress bar
    #[arg(long, global = true)]
    no_progress: bool,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger, later filtered through the global max level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger);
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => "🎬 ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // If log level is set via command line, apply it immediately
    if let Some(cli_level) = &cli.log_level {
        let level: LogLevel = cli_level.clone().into();
        log::set_max_level(LevelFilter::from(&level));
    }

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "stillcast", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Init { force }) => init_config(&cli.config_path, *force),
        Some(Commands::Caption) => {
            let mut controller = build_controller(&cli)?;
            let path = controller.caption_image()?;
            info!("Success: {}", path.display());
            Ok(())
        }
        Some(Commands::Subtitles) => {
            let controller = build_controller(&cli)?;
            let collection = controller.generate_subtitles()?;
            info!(
                "Success: {} ({} entries)",
                controller.subtitles_path().display(),
                collection.entries.len()
            );
            Ok(())
        }
        Some(Commands::Narrate) => {
            let controller = build_controller(&cli)?;
            let path = controller.synthesize_narration().await?;
            info!("Success: {}", path.display());
            Ok(())
        }
        Some(Commands::Run) | None => {
            let mut controller = build_controller(&cli)?;
            let report = controller.run().await?;

            let applied: Vec<String> = report
                .assembly
                .stages
                .iter()
                .filter(|r| matches!(r.outcome, StageOutcome::Completed(_)))
                .map(|r| r.stage.to_string())
                .collect();
            info!("Applied stages: {}", applied.join(", "));
            info!("Success: {}", report.video.display());
            Ok(())
        }
    }
}

// @writes: Default configuration file
fn init_config(config_path: &str, force: bool) -> Result<()> {
    if Path::new(config_path).exists() && !force {
        return Err(anyhow!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path
        ));
    }

    let config_json = serde_json::to_string_pretty(&Config::default())
        .context("Failed to serialize default config to JSON")?;

    std::fs::write(config_path, config_json)
        .context(format!("Failed to write default config to file: {}", config_path))?;

    info!("Default config written to {}", config_path);
    Ok(())
}

// @returns: Answer typed by the user for a missing config key
fn prompt_for(key: &'static str) -> Result<String> {
    let label = match key {
        "image" => "Path to the image",
        "text" => "Caption text",
        other => other,
    };
    warn!("No {} configured", key);

    let answer: String = Input::new()
        .with_prompt(label)
        .interact_text()
        .context(format!("Failed to read {} from the terminal", key))?;
    Ok(answer)
}

// @returns: Loaded, overridden and validated configuration
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load(&options.config_path)
        .context(format!("Failed to load config file: {}", options.config_path))?;

    // Override config with CLI options if provided
    if let Some(image) = &options.image {
        config.image = image.clone();
    }

    if let Some(text) = &options.text {
        config.text = text.clone();
    }

    if let Some(music) = &options.music {
        config.music = Some(music.clone());
    }

    if let Some(output) = &options.output {
        config.output_video = output.clone();
    }

    if let Some(duration) = options.duration {
        config.duration = duration;
    }

    // Update log level in config if specified via command line
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    let config = config.resolve_required(prompt_for)?;

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(LevelFilter::from(&config.log_level));
    }

    Ok(config)
}

fn build_controller(options: &CommandLineOptions) -> Result<Controller> {
    let config = load_config(options)?;
    let controller = Controller::with_config(config)?.with_progress(!options.no_progress);
    Ok(controller)
}
