//! Prompt rendering
//!
//! Builds the text of a user turn: one `<context>` block per submitted
//! file, in order, followed by the `<question>` block.

use crate::session::WorkingFile;
use std::fmt::Write;

/// Render files and a question into a single prompt
///
/// Files without loaded content render an empty block.
///
/// # Examples
///
/// ```
/// use cir::prompt::render;
///
/// assert_eq!(render(&[], "Why?"), "<question>\nWhy?\n</question>");
/// ```
pub fn render(files: &[WorkingFile], question: &str) -> String {
    let mut prompt = String::new();
    for file in files {
        // Writing into a String cannot fail
        let _ = writeln!(
            prompt,
            "<context file=\"{}\">\n{}\n</context>",
            file.path.display(),
            file.content.as_deref().unwrap_or_default()
        );
    }
    let _ = write!(prompt, "<question>\n{}\n</question>", question);
    prompt
}
