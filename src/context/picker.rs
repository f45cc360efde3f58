//! External file picker
//!
//! Runs a user-configured shell pipeline (by default `find | fzf-tmux`)
//! and reads the selected paths from its standard output.

use crate::error::{CirError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Outcome of running the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// The user confirmed a selection (possibly empty)
    Selected(Vec<PathBuf>),
    /// The picker exited unsuccessfully, usually because it was dismissed
    Cancelled,
}

/// Shell-command file picker
#[derive(Debug, Clone)]
pub struct FilePicker {
    command: String,
}

impl FilePicker {
    /// Create a picker for the given shell command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the picker and wait for the user's selection
    ///
    /// Standard input and error stay attached to the terminal so the
    /// picker can draw its interface.
    ///
    /// # Errors
    ///
    /// Returns `CirError::Picker` if the shell cannot be started.
    pub async fn pick(&self) -> Result<PickerOutcome> {
        tracing::debug!("Running file picker: {}", self.command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| CirError::Picker(format!("failed to run `{}`: {}", self.command, e)))?;

        if !output.status.success() {
            tracing::warn!(
                "File picker exited with {}, keeping current selection",
                output.status
            );
            return Ok(PickerOutcome::Cancelled);
        }

        let selection = parse_selection(&String::from_utf8_lossy(&output.stdout));
        tracing::info!("File picker selected {} files", selection.len());
        Ok(PickerOutcome::Selected(selection))
    }
}

/// Split picker output into paths, one per non-empty line
///
/// # Examples
///
/// ```
/// use cir::context::parse_selection;
/// use std::path::PathBuf;
///
/// let paths = parse_selection("./a.rs\n\n./b.rs\n");
/// assert_eq!(paths, vec![PathBuf::from("./a.rs"), PathBuf::from("./b.rs")]);
/// ```
pub fn parse_selection(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}
