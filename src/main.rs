// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use gagana::app_config::{Config, LogLevel};
use gagana::database::{DatabaseConnection, Feedback, Repository, TranslationStore};
use gagana::errors::AppError;
use gagana::server::{self, AppState};
use gagana::{SessionOutcome, StreamingRelay, TranslateMode, TranslationSession, model_config};

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

/// CLI Wrapper for Feedback to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFeedback {
    Upvote,
    Downvote,
}

impl From<CliFeedback> for Feedback {
    fn from(cli_feedback: CliFeedback) -> Self {
        match cli_feedback {
            CliFeedback::Upvote => Feedback::Upvote,
            CliFeedback::Downvote => Feedback::Downvote,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP translation relay
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate text and stream the result to stdout
    Translate(TranslateArgs),

    /// Record feedback for a stored translation
    Feedback {
        /// Transaction id printed after a translation
        transaction_id: String,

        /// Rating to record
        #[arg(value_enum)]
        feedback: CliFeedback,
    },

    /// List the selectable models
    Models,

    /// Generate shell completions for gagana
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Text to translate, or '-' to read standard input
    #[arg(value_name = "TEXT")]
    text: String,

    /// Translation direction (enToSm, smToEn, enToCh, chToEn)
    #[arg(short, long, default_value = "enToSm")]
    mode: String,

    /// Model id, see `gagana models`
    #[arg(short = 'M', long, default_value_t = i64::from(model_config::DEFAULT_MODEL_CONFIG_ID))]
    model: i64,

    /// User id stored with the translation (defaults to relay.default_user_id)
    #[arg(short, long)]
    user: Option<String>,
}

/// Gagana - streaming translation between English, Samoan and Chamorro
#[derive(Parser, Debug)]
#[command(name = "gagana")]
#[command(version = "0.1.0")]
#[command(about = "Streaming LLM translation relay for English, Samoan and Chamorro")]
#[command(long_about = "Gagana relays translations from hosted language models to callers token by token.

EXAMPLES:
    gagana serve                                  # Run the HTTP relay from conf.json
    gagana serve -p 8080                          # Listen on another port
    gagana translate \"Good morning\"               # English to Samoan with the default model
    gagana translate -m chToEn -M 3 \"Håfa adai\"   # Chamorro to English with Llama 2
    gagana feedback <TRANSACTION_ID> upvote       # Rate a stored translation
    gagana models                                 # List selectable models
    gagana completions bash > gagana.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. OPENAI_API_KEY and REPLICATE_API_KEY override
    the keys from the file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
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
    // Everything may log; the level is narrowed once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "gagana", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Models = cli.command {
        print_models();
        return Ok(());
    }

    let config = load_config(&cli.config_path, cli.log_level.clone())?;

    match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await,
        Commands::Translate(args) => run_translate(config, args).await.map_err(anyhow::Error::from),
        Commands::Feedback { transaction_id, feedback } => run_feedback(config, &transaction_id, feedback.into())
            .await
            .map_err(anyhow::Error::from),
        Commands::Models | Commands::Completions { .. } => Ok(()),
    }
}

// @returns: Validated config with env overrides and log level applied
fn load_config(config_path: &str, cli_log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = Config::load_or_create(config_path)?;
    config.apply_env_overrides();

    if let Some(log_level) = cli_log_level {
        config.log_level = log_level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn open_repository(config: &Config) -> Result<Repository> {
    let db = match config.database.custom_path() {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    Ok(Repository::new(db))
}

fn print_models() {
    println!("{:<4} {:<28} {}", "ID", "MODEL", "BACKEND");
    for config in model_config::all() {
        println!("{:<4} {:<28} {}", config.id, config.display_name, config.backend_kind);
    }
}

async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let repo = open_repository(&config)?;
    if let Ok(stats) = repo.connection().stats() {
        info!("Database: {}", stats);
    }

    let relay = StreamingRelay::from_config(&config);
    let state = Arc::new(AppState::new(relay, Arc::new(repo), config.relay.default_user_id.clone()));

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    server::serve(listener, state, config.server.allow_any_origin).await
}

async fn run_translate(config: Config, args: TranslateArgs) -> Result<(), AppError> {
    let text = if args.text == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.text
    };
    let mode: TranslateMode = args
        .mode
        .parse()
        .map_err(|e: anyhow::Error| AppError::Config(e.to_string()))?;

    let relay = StreamingRelay::from_config(&config);
    let store: Arc<dyn TranslationStore> = Arc::new(open_repository(&config)?);
    let user_id = args.user.unwrap_or_else(|| config.relay.default_user_id.clone());

    let mut session = TranslationSession::new(store, user_id);
    session.set_translate_mode(mode);
    session.set_model_config_id(args.model);
    session.set_input(text);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Translating {} → {}", mode.source(), mode.target()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut stdout = std::io::stdout();
    let outcome = session
        .translate(&relay, |fragment| {
            if !spinner.is_finished() {
                spinner.finish_and_clear();
            }
            let _ = stdout.write_all(fragment.as_bytes());
            let _ = stdout.flush();
        })
        .await;
    spinner.finish_and_clear();

    match outcome {
        SessionOutcome::Completed { transaction_id, .. } => {
            println!();
            match transaction_id {
                Some(id) => info!("Transaction id: {}", id),
                None => warn!("Translation was not stored; feedback is unavailable"),
            }
            Ok(())
        }
        SessionOutcome::Failed { notice } => {
            println!();
            Err(AppError::Translation(notice))
        }
    }
}

async fn run_feedback(config: Config, transaction_id: &str, feedback: Feedback) -> Result<(), AppError> {
    let repo = open_repository(&config)?;
    repo.update_feedback(transaction_id, feedback).await?;
    info!("Recorded {} for {}", feedback, transaction_id);
    Ok(())
}
