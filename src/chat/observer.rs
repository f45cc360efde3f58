//! Callbacks for whatever renders the conversation

use crate::session::Message;

/// Receives change notifications from the chat client
///
/// Callbacks run on the task that made the change, with the session
/// locked. They must not block.
pub trait ChatObserver: Send + Sync {
    /// The message log changed (a turn was appended or a reply grew)
    fn messages_changed(&self, _messages: &[Message]) {}

    /// Submissions were disabled (`false`) or re-enabled (`true`)
    fn input_enabled_changed(&self, _enabled: bool) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ChatObserver for NullObserver {}
