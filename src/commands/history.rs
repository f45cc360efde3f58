use crate::commands::render::format_history;
use crate::config::Config;
use crate::error::Result;
use crate::session::{SessionStorage, YamlSessionStore};
use colored::Colorize;

/// Print the conversation stored in the configured session file
pub fn handle_history(config: &Config, full: bool) -> Result<()> {
    let storage = YamlSessionStore::new(config.session.resolved_path());
    let session = storage.load()?;

    if session.messages.is_empty() {
        println!("{}", "No conversation history found.".yellow());
        return Ok(());
    }

    println!("{}", format_history(&session.messages, full));
    println!();
    println!(
        "{}",
        format!(
            "{} messages in {}",
            session.messages.len(),
            storage.path().display()
        )
        .dimmed()
    );
    Ok(())
}
