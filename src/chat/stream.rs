//! Streaming reply state machine
//!
//! ```text
//! Idle --start--> Streaming --Chunk--> Streaming
//!                     |--Done--> Completed
//!                     `--Error--> Failed
//! ```
//!
//! Terminal states are final: events arriving after them are dropped.

use crate::providers::StreamEvent;
use crate::session::WorkingSession;

/// Lifecycle of one streamed reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl StreamState {
    /// True for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Applies stream events to the placeholder reply of a session
#[derive(Debug)]
pub struct StreamConsumer {
    placeholder: usize,
    accumulated: String,
    state: StreamState,
}

impl StreamConsumer {
    /// Consumer targeting the message at index `placeholder`
    pub fn new(placeholder: usize) -> Self {
        Self {
            placeholder,
            accumulated: String::new(),
            state: StreamState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Enter `Streaming` with an empty placeholder
    pub fn start(&mut self, session: &mut WorkingSession) {
        if self.state != StreamState::Idle {
            return;
        }
        self.accumulated.clear();
        self.write_placeholder(session, String::new());
        self.state = StreamState::Streaming;
    }

    /// Apply one event
    ///
    /// A chunk extends the reply. `Done` completes it. An error replaces
    /// whatever was accumulated with the error text. Returns whether the
    /// message log changed.
    pub fn apply(&mut self, event: StreamEvent, session: &mut WorkingSession) -> bool {
        if self.state.is_terminal() {
            tracing::debug!("Dropping stream event after {:?}: {:?}", self.state, event);
            return false;
        }
        if self.state == StreamState::Idle {
            self.start(session);
        }

        match event {
            StreamEvent::Chunk(text) => {
                if text.is_empty() {
                    return false;
                }
                self.accumulated.push_str(&text);
                self.write_placeholder(session, self.accumulated.clone());
                true
            }
            StreamEvent::Done => {
                tracing::info!("Reply completed ({} bytes)", self.accumulated.len());
                self.state = StreamState::Completed;
                false
            }
            StreamEvent::Error(err) => {
                tracing::error!("Reply failed: {}", err);
                self.state = StreamState::Failed;
                self.write_placeholder(session, format!("Error: {}", err));
                true
            }
        }
    }

    fn write_placeholder(&self, session: &mut WorkingSession, content: String) {
        match session.messages.get_mut(self.placeholder) {
            Some(message) => message.content = content,
            None => tracing::warn!("Reply placeholder {} is missing", self.placeholder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CirError;

    fn session_with_placeholder() -> (WorkingSession, usize) {
        let mut session = WorkingSession::new();
        session.append_user_turn("prompt", "q", &[]);
        let idx = session.append_placeholder();
        (session, idx)
    }

    #[test]
    fn test_chunks_accumulate_then_complete() {
        let (mut session, idx) = session_with_placeholder();
        let mut consumer = StreamConsumer::new(idx);
        consumer.start(&mut session);
        assert_eq!(consumer.state(), StreamState::Streaming);

        assert!(consumer.apply(StreamEvent::Chunk("Hel".into()), &mut session));
        assert_eq!(session.messages[idx].content, "Hel");
        assert!(consumer.apply(StreamEvent::Chunk("lo".into()), &mut session));
        consumer.apply(StreamEvent::Done, &mut session);

        assert_eq!(consumer.state(), StreamState::Completed);
        assert_eq!(session.messages[idx].content, "Hello");
    }

    #[test]
    fn test_error_replaces_partial_text() {
        let (mut session, idx) = session_with_placeholder();
        let mut consumer = StreamConsumer::new(idx);
        consumer.start(&mut session);

        consumer.apply(StreamEvent::Chunk("Hel".into()), &mut session);
        consumer.apply(
            StreamEvent::Error(CirError::Network("connection reset".into())),
            &mut session,
        );

        assert_eq!(consumer.state(), StreamState::Failed);
        assert_eq!(
            session.messages[idx].content,
            "Error: Network error: connection reset"
        );
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let (mut session, idx) = session_with_placeholder();
        let mut consumer = StreamConsumer::new(idx);
        consumer.start(&mut session);
        consumer.apply(StreamEvent::Chunk("done".into()), &mut session);
        consumer.apply(StreamEvent::Done, &mut session);

        assert!(!consumer.apply(StreamEvent::Chunk(" more".into()), &mut session));
        assert!(!consumer.apply(StreamEvent::Error(CirError::Cancelled), &mut session));

        assert_eq!(consumer.state(), StreamState::Completed);
        assert_eq!(session.messages[idx].content, "done");
    }

    #[test]
    fn test_first_event_from_idle_starts_streaming() {
        let (mut session, idx) = session_with_placeholder();
        session.messages[idx].content = "stale".into();
        let mut consumer = StreamConsumer::new(idx);

        consumer.apply(StreamEvent::Chunk("new".into()), &mut session);

        assert_eq!(consumer.state(), StreamState::Streaming);
        assert_eq!(session.messages[idx].content, "new");
    }

    #[test]
    fn test_missing_placeholder_does_not_panic() {
        let mut session = WorkingSession::new();
        let mut consumer = StreamConsumer::new(5);
        consumer.apply(StreamEvent::Chunk("x".into()), &mut session);
        consumer.apply(StreamEvent::Done, &mut session);
        assert_eq!(consumer.state(), StreamState::Completed);
        assert!(session.messages.is_empty());
    }
}
