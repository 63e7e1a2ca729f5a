//! Delver CLI: the main entry point.
//!
//! Commands:
//! - `chat`   : Ask a single question or start the interactive REPL
//! - `tools`  : Show retrieval tool status and loop settings
//! - `init`   : Write a default config file
//! - `status` : Show the resolved configuration
//! - `doctor` : Check config, credentials, tools and the model connection

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use delver_config::AgentMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "delver",
    about = "Delver — an iterative research assistant that searches before it answers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.delver/config.toml)
    #[arg(short, long, global = true, env = "DELVER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question, or chat interactively
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override `agent_config.mode`
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Show retrieval tools, agent config and search strategy
    Tools,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show resolved configuration
    Status,

    /// Diagnose config, credentials, tool loading and the model connection
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// analyze → gather → synthesize → evaluate
    Pipeline,
    /// Let the model call tools itself
    Tools,
}

impl From<ModeArg> for AgentMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pipeline => AgentMode::Pipeline,
            ModeArg::Tools => AgentMode::ToolCalling,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins, then LOG_LEVEL, then the --verbose default.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|level| tracing_subscriber::EnvFilter::try_new(level.to_ascii_lowercase()).ok())
        })
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat { message, mode } => {
            commands::chat::run(config_path, message, mode.map(Into::into)).await?
        }
        Commands::Tools => commands::tools::run(config_path).await?,
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
