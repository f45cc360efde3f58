//! Cir - terminal chat client with persistent sessions and file context
//!
#![doc = "Main entry point for the cir binary."]

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cir::cli::{Cli, Commands};
use cir::commands;
use cir::config::{default_config_path, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path, &cli)?;

    // Initialize tracing once we know where the log file goes
    init_tracing(&config.logging.file, cli.verbose)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
        }
        Commands::Ask { question } => {
            tracing::info!("Answering a single question");
            commands::ask::run_ask(config, question).await?;
        }
        Commands::Context { command } => {
            tracing::info!("Starting context command");
            commands::context::handle_context(&config, command).await?;
        }
        Commands::History { full } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(&config, full)?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Output goes to `log_file` so it never interleaves with the chat.
fn init_tracing(log_file: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose { "cir=debug" } else { "cir=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let path = Path::new(log_file);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(())
}
