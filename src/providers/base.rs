//! Base provider trait and common types for Cir
//!
//! A provider turns the conversation history into one ordered stream of
//! [`StreamEvent`]s. Every stream ends with exactly one terminal event.

use crate::error::{CirError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Message in the shape the language-model service expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ServiceMessage {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use cir::providers::ServiceMessage;
    ///
    /// let msg = ServiceMessage::user("Hello");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One event of a streamed reply
#[derive(Debug)]
pub enum StreamEvent {
    /// Incremental reply text
    Chunk(String),
    /// Clean end of the reply
    Done,
    /// The reply failed; no further events follow
    Error(CirError),
}

impl StreamEvent {
    /// True for `Done` and `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Streaming chat provider
///
/// Implementations spawn their own producer task and hand back the
/// receiving half of the event channel. Dropping the receiver stops the
/// producer at its next send.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Start streaming a reply to `messages`
    ///
    /// # Errors
    ///
    /// Fails before any event is produced when the request cannot be
    /// started at all, e.g. `CirError::MissingCredentials`.
    async fn stream_chat(&self, messages: &[ServiceMessage])
        -> Result<mpsc::Receiver<StreamEvent>>;
}
