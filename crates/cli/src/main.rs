//! Memory Garden CLI, the process boundary the web front end calls into.
//!
//! Commands:
//! - `chat`     Continue a conversation (one JSON result)
//! - `reflect`  Reflect on one memory (one JSON result)
//! - `stream`   Continue a conversation as JSON lines
//! - `image`    Generate an image from a JSON job on stdin
//! - `analyze`  Describe a photo or video (file or JSON job on stdin)
//! - `config`   Inspect and edit configuration
//! - `providers` List known providers
//! - `doctor`   Diagnose configuration and provider health

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "memgarden",
    about = "Memory Garden: AI companion and image generation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Text or image provider to use instead of the configured default
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model to use instead of the provider default
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Continue a conversation
    Chat {
        /// The new user message
        message: String,
        /// Prior turns as a JSON array of {role, content}
        history: Option<String>,
        /// Site context as a JSON object
        context: Option<String>,
    },

    /// Reflect on a memory
    Reflect {
        title: String,
        description: String,
    },

    /// Continue a conversation, printing one JSON event per line
    Stream {
        message: String,
        history: Option<String>,
        context: Option<String>,
    },

    /// Generate an image from a JSON job read on stdin
    Image,

    /// Describe a photo or video; reads a JSON job on stdin when no file is given
    Analyze {
        file: Option<PathBuf>,
        /// What the user remembers about the media
        #[arg(long)]
        context: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List known text, image and media providers
    Providers,

    /// Diagnose configuration and provider health
    Doctor,

    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the application config and personality document
    Show,
    /// Print the config file paths
    Path,
    /// Write the personality document to a file (stdout when omitted)
    Export { file: Option<PathBuf> },
    /// Replace the personality document with a JSON file
    Import { file: PathBuf },
    /// Deep-merge a JSON object into the personality document
    Update { json: String },
    /// Restore the default personality document
    Reset,
    /// Validate config.toml and the personality document
    Validate,
}

impl Commands {
    /// Whether failures are reported as a JSON object on stdout.
    fn reports_json(&self) -> bool {
        matches!(
            self,
            Self::Chat { .. } | Self::Reflect { .. } | Self::Image | Self::Analyze { .. }
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // API keys usually live in the front end's .env.local
    let _ = dotenvy::from_filename(".env.local");

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let overrides = commands::Overrides {
        provider: cli.provider,
        model: cli.model,
    };
    let reports_json = cli.command.reports_json();
    let is_stream = matches!(cli.command, Commands::Stream { .. });

    let result = match cli.command {
        Commands::Chat {
            message,
            history,
            context,
        } => commands::chat::run(&overrides, &message, history.as_deref(), context.as_deref()).await,
        Commands::Reflect { title, description } => {
            commands::chat::reflect(&overrides, &title, &description).await
        }
        Commands::Stream {
            message,
            history,
            context,
        } => commands::stream::run(&overrides, &message, history.as_deref(), context.as_deref()).await,
        Commands::Image => commands::image::run(&overrides).await,
        Commands::Analyze { file, context } => {
            commands::analyze::run(&overrides, file.as_deref(), context.as_deref()).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(),
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Export { file } => commands::config_cmd::export(file.as_deref()),
            ConfigAction::Import { file } => commands::config_cmd::import(&file),
            ConfigAction::Update { json } => commands::config_cmd::update(&json),
            ConfigAction::Reset => commands::config_cmd::reset(),
            ConfigAction::Validate => commands::config_cmd::validate(),
        },
        Commands::Providers => commands::providers::run(&overrides),
        Commands::Doctor => commands::doctor::run().await,
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "memgarden", &mut std::io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if reports_json {
                output::emit(&output::failure(&e));
            } else if is_stream {
                output::emit_line(&memgarden_companion::StreamEvent::Error {
                    error: e.to_string(),
                });
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
