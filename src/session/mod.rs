//! Working session domain model
//!
//! The [`WorkingSession`] is the root aggregate persisted between runs: the
//! chronological message log, the tracked context files and the unsent
//! draft. These types are independent of any on-disk schema; the
//! [`schema`] module maps them to and from every stored version.

pub mod schema;
pub mod store;

pub use store::{SessionStorage, YamlSessionStore};

use crate::providers::ServiceMessage;
use std::fmt;
use std::path::PathBuf;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Turn typed by the user (content is the rendered prompt)
    #[default]
    User,
    /// Reply streamed from the language-model service
    Assistant,
    /// Instruction-level message
    System,
}

impl Role {
    /// Wire name used by the service and the session file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse a wire name, case-insensitively
    pub(crate) fn parse_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file whose content may be embedded as context in a prompt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkingFile {
    /// Filesystem path; unique within a session
    pub path: PathBuf,
    /// Checksum of the content last embedded in a prompt
    pub last_submitted_checksum: Option<String>,
    /// Content read for the current submission; never persisted
    pub content: Option<String>,
}

impl WorkingFile {
    /// Create a tracked file that has never been submitted
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_submitted_checksum: None,
            content: None,
        }
    }

    /// Copy of this entry without transient content
    pub fn snapshot(&self) -> Self {
        Self {
            path: self.path.clone(),
            last_submitted_checksum: self.last_submitted_checksum.clone(),
            content: None,
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Author of the turn
    pub role: Role,
    /// Text sent to (rendered prompt) or received from the service
    pub content: String,
    /// Raw user-typed question, shown instead of the rendered prompt
    pub question: String,
    /// Files (path + checksum) embedded in this turn's prompt
    pub included_working_files: Vec<WorkingFile>,
}

impl Message {
    /// User turn carrying a rendered prompt
    pub fn user(
        content: impl Into<String>,
        question: impl Into<String>,
        included_working_files: Vec<WorkingFile>,
    ) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            question: question.into(),
            included_working_files,
        }
    }

    /// Service reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            question: String::new(),
            included_working_files: Vec::new(),
        }
    }

    /// Text to show in a history view: the question for user turns,
    /// the content otherwise
    pub fn display_text(&self) -> &str {
        match self.role {
            Role::User if !self.question.is_empty() => &self.question,
            _ => &self.content,
        }
    }

    fn to_service_message(&self) -> ServiceMessage {
        ServiceMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Durable aggregate of history, tracked files and draft input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkingSession {
    /// Chronological message log
    pub messages: Vec<Message>,
    /// Tracked context files, unique by path
    pub working_files: Vec<WorkingFile>,
    /// Draft of an unsent question
    pub input_text: String,
}

impl WorkingSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn and fold the submitted checksums back into the
    /// tracked files in the same step
    ///
    /// `submitted` is the output of the content differ: each entry carries
    /// the checksum of the content that was rendered into `prompt`. The
    /// message keeps a content-free snapshot of those entries.
    ///
    /// # Returns
    ///
    /// Index of the appended message
    pub fn append_user_turn(
        &mut self,
        prompt: impl Into<String>,
        question: impl Into<String>,
        submitted: &[WorkingFile],
    ) -> usize {
        let snapshot = submitted.iter().map(WorkingFile::snapshot).collect();
        self.messages.push(Message::user(prompt, question, snapshot));
        self.commit_checksums(submitted);
        self.messages.len() - 1
    }

    /// Append an empty reply that a response stream will fill in
    ///
    /// # Returns
    ///
    /// Index of the placeholder
    pub fn append_placeholder(&mut self) -> usize {
        self.messages.push(Message::assistant(""));
        self.messages.len() - 1
    }

    /// The whole log as service messages, in order
    pub fn service_history(&self) -> Vec<ServiceMessage> {
        self.messages
            .iter()
            .map(Message::to_service_message)
            .collect()
    }

    /// Replace the tracked files wholesale
    ///
    /// Duplicate paths keep their first position. Every entry starts
    /// without a checksum, so the next question re-embeds all of them.
    pub fn replace_working_files<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut files: Vec<WorkingFile> = Vec::new();
        for path in paths {
            let path = path.into();
            if files.iter().any(|f| f.path == path) {
                continue;
            }
            files.push(WorkingFile::new(path));
        }
        tracing::debug!("Tracking {} working files", files.len());
        self.working_files = files;
    }

    /// Drop transient content from every tracked file
    pub fn clear_file_contents(&mut self) {
        for file in &mut self.working_files {
            file.content = None;
        }
        for message in &mut self.messages {
            for file in &mut message.included_working_files {
                file.content = None;
            }
        }
    }

    fn commit_checksums(&mut self, submitted: &[WorkingFile]) {
        for file in &mut self.working_files {
            if let Some(sent) = submitted.iter().find(|s| s.path == file.path) {
                file.last_submitted_checksum = sent.last_submitted_checksum.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tracked_file;

    fn submitted(path: &str, checksum: &str) -> WorkingFile {
        tracked_file(path, Some(checksum), Some("body"))
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(Role::parse_str("USER"), Some(Role::User));
        assert_eq!(Role::parse_str("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse_str("tool"), None);
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_append_user_turn_commits_checksums() {
        let mut session = WorkingSession::new();
        session.replace_working_files(["a.txt", "b.txt"]);

        let idx = session.append_user_turn("prompt", "question", &[submitted("b.txt", "abc")]);

        assert_eq!(idx, 0);
        assert_eq!(session.working_files[0].last_submitted_checksum, None);
        assert_eq!(
            session.working_files[1].last_submitted_checksum.as_deref(),
            Some("abc")
        );
        // Tracked files never keep the content they were diffed with
        assert!(session.working_files[1].content.is_none());

        let message = &session.messages[0];
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "prompt");
        assert_eq!(message.question, "question");
        assert_eq!(message.included_working_files.len(), 1);
        assert!(message.included_working_files[0].content.is_none());
    }

    #[test]
    fn test_append_placeholder_is_empty_assistant_turn() {
        let mut session = WorkingSession::new();
        session.append_user_turn("p", "q", &[]);
        let idx = session.append_placeholder();
        assert_eq!(idx, 1);
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert!(session.messages[1].content.is_empty());
    }

    #[test]
    fn test_service_history_keeps_order() {
        let mut session = WorkingSession::new();
        session.append_user_turn("first", "q1", &[]);
        session.messages.push(Message::assistant("reply"));
        session.append_user_turn("second", "q2", &[]);

        let history = session.service_history();
        let roles: Vec<&str> = history.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(history[2].content, "second");
    }

    #[test]
    fn test_replace_working_files_dedups_and_resets_checksums() {
        let mut session = WorkingSession::new();
        session.working_files.push(submitted("old.txt", "x"));

        session.replace_working_files(["a.txt", "b.txt", "a.txt"]);

        let paths: Vec<_> = session.working_files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert!(session
            .working_files
            .iter()
            .all(|f| f.last_submitted_checksum.is_none()));
    }

    #[test]
    fn test_display_text_prefers_question_for_user_turns() {
        let user = Message::user("<context>..</context>", "What?", vec![]);
        assert_eq!(user.display_text(), "What?");
        let reply = Message::assistant("Answer");
        assert_eq!(reply.display_text(), "Answer");
    }
}
