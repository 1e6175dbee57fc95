// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use subtrans::app_config::{Config, LogLevel};
use subtrans::app_controller::{Controller, TranslateOptions};

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
    /// Load a subtitle file and group its lines into scenes and batches
    Batch {
        /// Subtitle file to load
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Project file to write (default: <INPUT>.subtrans.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate a project file in place
    Translate(TranslateArgs),

    /// Check the translations in a project file
    Validate {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,
    },

    /// Write a project file out as SRT
    Compose {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Output file (default: <PROJECT>.<language>.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the original text instead of the translation
        #[arg(long)]
        original: bool,
    },

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Project file created by `subtrans batch`
    #[arg(value_name = "PROJECT")]
    project: PathBuf,

    /// Translation provider to use
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Scenes to translate, e.g. 1,2,5
    #[arg(short, long, value_delimiter = ',')]
    scenes: Option<Vec<usize>>,

    /// Stream responses and report lines as they arrive
    #[arg(long)]
    stream: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

/// subtrans - scene-aware subtitle translation with AI
///
/// Groups subtitles into scenes and batches, then translates them batch by
/// batch with a language model, keeping a running summary as context.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Scene-aware subtitle translation tool")]
#[command(long_about = "subtrans groups subtitles into scenes and batches and translates them with a language model.

EXAMPLES:
    subtrans batch movie.srt                          # Create movie.subtrans.json
    subtrans translate movie.subtrans.json            # Translate with the configured provider
    subtrans translate -m llama3.1 --stream movie.subtrans.json
    subtrans translate --scenes 3,4 movie.subtrans.json
    subtrans validate movie.subtrans.json             # Re-check translations
    subtrans compose -o movie.fr.srt movie.subtrans.json
    subtrans completions bash > subtrans.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    mock      - Offline echo provider for dry runs")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
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
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
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
    // Trace is the ceiling; the effective level is set once the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    log::set_max_level(config.log_level.as_level_filter());

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Batch { input, output } => {
            controller.batch_file(&input, output.as_deref())?;
        }
        Commands::Translate(args) => run_translate(&controller, args).await?,
        Commands::Validate { project } => {
            let results = controller.validate_project(&project)?;
            if !results.is_empty() {
                return Err(anyhow!("{} batch(es) failed validation", results.len()));
            }
        }
        Commands::Compose {
            project,
            output,
            original,
        } => {
            controller.compose(&project, output.as_deref(), original)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn run_translate(controller: &Controller, args: TranslateArgs) -> Result<()> {
    let abort = controller.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request…");
            abort.abort();
        }
    });

    let options = TranslateOptions {
        provider: args.provider,
        model: args.model,
        scenes: args.scenes,
        stream: args.stream,
        progress: !args.no_progress,
    };

    match controller.translate_project(&args.project, options).await {
        Ok(_) => Ok(()),
        Err(e) if controller.abort_handle().is_aborted() => {
            warn!("{}", e);
            info!("Translation stopped, progress saved to {}", args.project.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
