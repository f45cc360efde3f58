//! Terminal rendering of the conversation

use crate::chat::ChatObserver;
use crate::session::{Message, Role, WorkingFile};
use colored::Colorize;
use std::io::Write;
use std::sync::Mutex;

/// Separator between turns in the history view
pub const TURN_SEPARATOR: &str = "\n\n---\n";

/// Render the log as the history view shows it
///
/// User turns show the typed question, or the rendered prompt when `full`
/// is set; replies show their content.
pub fn format_history(messages: &[Message], full: bool) -> String {
    messages
        .iter()
        .map(|m| if full { m.content.as_str() } else { m.display_text() })
        .collect::<Vec<_>>()
        .join(TURN_SEPARATOR)
}

/// One line per tracked file, marking those that were never submitted
pub fn format_working_files(files: &[WorkingFile]) -> String {
    if files.is_empty() {
        return "No context files tracked.".to_string();
    }
    files
        .iter()
        .map(|f| {
            let marker = if f.last_submitted_checksum.is_none() { "*" } else { " " };
            format!("{} {}", marker, f.path.display())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints streamed replies to stdout as they grow
///
/// Keeps the text already printed for the newest reply and writes only
/// the new suffix. A reply whose content was replaced (a failed request)
/// is printed again in red.
#[derive(Debug, Default)]
pub struct TerminalObserver {
    printed: Mutex<Option<(usize, String)>>,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatObserver for TerminalObserver {
    fn messages_changed(&self, messages: &[Message]) {
        let Some(last) = messages.last() else {
            return;
        };
        if last.role != Role::Assistant {
            return;
        }
        let index = messages.len() - 1;

        let mut printed = match self.printed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let already = match printed.as_ref() {
            Some((i, text)) if *i == index => text.as_str(),
            _ => "",
        };

        let mut stdout = std::io::stdout();
        if let Some(delta) = last.content.strip_prefix(already) {
            let _ = write!(stdout, "{}", delta);
        } else {
            let _ = write!(stdout, "\n{}", last.content.red());
        }
        let _ = stdout.flush();

        *printed = Some((index, last.content.clone()));
    }

    fn input_enabled_changed(&self, enabled: bool) {
        if enabled {
            println!("\n");
        }
    }
}
