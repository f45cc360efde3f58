//! Command-line interface definition for Cir
//!
//! This module defines the CLI structure using clap's derive API.
//! Running `cir` without a subcommand starts the interactive chat.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cir - chat with a language model about your local files
///
/// Keeps one persistent conversation per session file and re-sends
/// tracked files only when their content changed.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to ~/.cir/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the session file
    #[arg(short, long, env = "CIR_SESSION_PATH")]
    pub session: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Cir
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,

    /// Submit a single question, stream the reply to stdout and exit
    Ask {
        /// Question text; multiple words are joined with spaces
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Manage the files attached as context
    Context {
        /// Context subcommand
        #[command(subcommand)]
        command: ContextCommand,
    },

    /// Print the conversation history
    History {
        /// Show rendered prompts (with embedded files) instead of questions
        #[arg(long)]
        full: bool,
    },
}

/// Context file subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ContextCommand {
    /// Run the configured file picker and replace the tracked files
    Pick,

    /// Replace the tracked files with the given paths
    Set {
        /// Paths to track
        paths: Vec<PathBuf>,
    },

    /// List the tracked files
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
