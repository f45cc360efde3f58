//! Special commands parser for the interactive chat
//!
//! Commands are prefixed with `/` and are case-insensitive. `exit` and
//! `quit` are accepted without the prefix. Anything else is a question.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),
}

/// Commands handled by the chat loop instead of being sent as a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Run the file picker and replace the tracked files
    Context,
    /// Show the tracked files and whether each is pending submission
    Files,
    /// Print the conversation so far
    History,
    /// Display help information
    Help,
    /// Save and leave the chat
    Exit,
    /// Not a special command
    None,
}

/// Parse a line of input
///
/// # Examples
///
/// ```
/// use cir::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/files").unwrap(), SpecialCommand::Files);
/// assert_eq!(parse_special_command("why?").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/nope").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/context" | "/pick" => Ok(SpecialCommand::Context),
        "/files" | "/ctx" => Ok(SpecialCommand::Files),
        "/history" => Ok(SpecialCommand::History),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CONTEXT FILES:
  /context        - Run the file picker and replace the tracked files
  /files          - Show tracked files (* = not yet submitted)

SESSION:
  /history        - Print the conversation so far
  /help           - Show this help
  /exit           - Save the session and quit (also Ctrl-D)

While a reply is streaming, press Ctrl-C to cancel it.
Tracked files are re-sent only when their content changed.
"#
    );
}
