//! Chat client: question submission and reply streaming
//!
//! [`ChatClient`] owns the working session for the lifetime of the
//! program. A submission diffs the tracked files, renders the prompt,
//! appends the user turn, persists, and then hands the reply to a spawned
//! driver task that feeds provider events through a [`StreamConsumer`].
//! The session is persisted exactly twice per question: before
//! sending, and once on whichever terminal state the reply reaches.

use crate::chat::gate::InputGate;
use crate::chat::observer::ChatObserver;
use crate::chat::stream::{StreamConsumer, StreamState};
use crate::context::{self, FilePicker, PickerOutcome};
use crate::error::{CirError, Result};
use crate::prompt;
use crate::providers::{ChatProvider, StreamEvent};
use crate::session::{SessionStorage, WorkingSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of [`ChatClient::submit_question`]
#[derive(Debug)]
pub enum Submission {
    /// Blank input; nothing happened
    Ignored,
    /// A reply is already streaming; nothing happened
    Busy,
    /// The question was sent and its reply is streaming
    Started(RequestHandle),
}

/// Handle to one in-flight reply
#[derive(Debug)]
pub struct RequestHandle {
    join: JoinHandle<StreamState>,
    cancel: CancellationToken,
}

impl RequestHandle {
    /// Ask the driver to stop; the reply still ends in `Failed`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the terminal state (after it has been persisted)
    pub async fn finished(self) -> StreamState {
        match self.join.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Reply driver task failed: {}", e);
                StreamState::Failed
            }
        }
    }
}

struct Shared {
    session: Mutex<WorkingSession>,
    storage: Arc<dyn SessionStorage>,
    provider: Arc<dyn ChatProvider>,
    observer: Arc<dyn ChatObserver>,
    gate: InputGate,
    in_flight: std::sync::Mutex<Option<CancellationToken>>,
}

impl Shared {
    fn set_in_flight(&self, token: Option<CancellationToken>) {
        match self.in_flight.lock() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn reopen(&self) {
        self.set_in_flight(None);
        self.gate.open();
        self.observer.input_enabled_changed(true);
    }
}

/// Conversation front end shared by the terminal loop and one-shot commands
#[derive(Clone)]
pub struct ChatClient {
    shared: Arc<Shared>,
}

impl ChatClient {
    /// Wrap an already loaded session
    pub fn new(
        session: WorkingSession,
        storage: Arc<dyn SessionStorage>,
        provider: Arc<dyn ChatProvider>,
        observer: Arc<dyn ChatObserver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                storage,
                provider,
                observer,
                gate: InputGate::new(),
                in_flight: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Load the session from `storage` and wrap it
    ///
    /// # Errors
    ///
    /// Storage and parse failures are fatal here.
    pub fn open(
        storage: Arc<dyn SessionStorage>,
        provider: Arc<dyn ChatProvider>,
        observer: Arc<dyn ChatObserver>,
    ) -> Result<Self> {
        let session = storage.load()?;
        Ok(Self::new(session, storage, provider, observer))
    }

    /// Whether a new question would be accepted
    pub fn is_input_enabled(&self) -> bool {
        self.shared.gate.is_enabled()
    }

    /// Wait until no reply is streaming
    pub async fn wait_idle(&self) {
        self.shared.gate.wait_enabled().await;
    }

    /// Copy of the current session
    pub async fn snapshot(&self) -> WorkingSession {
        self.shared.session.lock().await.clone()
    }

    /// Cancel the in-flight reply, if any
    ///
    /// Returns whether there was one to cancel.
    pub fn cancel(&self) -> bool {
        let token = match self.shared.in_flight.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        match token {
            Some(token) => {
                tracing::info!("Cancelling in-flight reply");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Submit a question
    ///
    /// Blank input is ignored and a question submitted while a reply is
    /// streaming is rejected as `Busy`; neither touches the session.
    /// Otherwise the user turn is appended together with the checksums of
    /// the files embedded in it, the session is saved, an empty reply is
    /// appended and streaming starts.
    ///
    /// # Errors
    ///
    /// Returns error only if saving before sending fails. The session is
    /// then left as it was, except that the question becomes the draft,
    /// and submissions are re-enabled.
    pub async fn submit_question(&self, text: &str) -> Result<Submission> {
        if text.trim().is_empty() {
            return Ok(Submission::Ignored);
        }
        let shared = &self.shared;
        if !shared.gate.try_close() {
            tracing::debug!("Question rejected: reply in flight");
            return Ok(Submission::Busy);
        }
        shared.observer.input_enabled_changed(false);

        let mut session = shared.session.lock().await;
        let before = session.clone();

        let submitted = context::files_to_submit(&session.working_files).await;
        let rendered = prompt::render(&submitted, text);
        tracing::info!(
            "Submitting question with {} of {} context files",
            submitted.len(),
            session.working_files.len()
        );
        session.append_user_turn(rendered, text, &submitted);
        session.input_text.clear();

        if let Err(e) = shared.storage.save(&session) {
            tracing::error!("Failed to save session before sending: {:#}", e);
            *session = before;
            // The unsent question becomes the draft
            session.input_text = text.to_string();
            drop(session);
            shared.reopen();
            return Err(e);
        }
        shared.observer.messages_changed(&session.messages);

        let history = session.service_history();
        let placeholder = session.append_placeholder();
        shared.observer.messages_changed(&session.messages);
        drop(session);

        let cancel = CancellationToken::new();
        shared.set_in_flight(Some(cancel.clone()));

        let events = match shared.provider.stream_chat(&history).await {
            Ok(events) => events,
            Err(e) => failed_stream(e),
        };

        let join = tokio::spawn(drive_reply(
            Arc::clone(shared),
            events,
            placeholder,
            cancel.clone(),
        ));
        Ok(Submission::Started(RequestHandle { join, cancel }))
    }

    /// Update the unsent draft (kept in memory until the next save)
    pub async fn set_input_text(&self, text: impl Into<String>) {
        self.shared.session.lock().await.input_text = text.into();
    }

    /// Replace the tracked files and save
    ///
    /// Returns false without changes while a reply is streaming.
    pub async fn set_working_files<I, P>(&self, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if !self.is_input_enabled() {
            tracing::warn!("Context change rejected: reply in flight");
            return Ok(false);
        }
        let mut session = self.shared.session.lock().await;
        session.replace_working_files(paths);
        self.shared.storage.save(&session)?;
        Ok(true)
    }

    /// Run the picker and replace the tracked files with its selection
    ///
    /// A dismissed picker leaves the current selection in place.
    pub async fn pick_context(&self, picker: &FilePicker) -> Result<PickerOutcome> {
        let outcome = picker.pick().await?;
        if let PickerOutcome::Selected(paths) = &outcome {
            self.set_working_files(paths.iter().cloned()).await?;
        }
        Ok(outcome)
    }

    /// Persist the current session
    pub async fn save(&self) -> Result<()> {
        let session = self.shared.session.lock().await;
        self.shared.storage.save(&session)
    }
}

/// Channel that yields a single error, for requests that never started
fn failed_stream(err: anyhow::Error) -> mpsc::Receiver<StreamEvent> {
    let err = match err.downcast::<CirError>() {
        Ok(typed) => typed,
        Err(other) => CirError::Network(format!("{:#}", other)),
    };
    tracing::error!("Reply could not be started: {}", err);
    let (tx, rx) = mpsc::channel(1);
    // Capacity 1 and no other sender
    let _ = tx.try_send(StreamEvent::Error(err));
    rx
}

/// Reopens submissions when the reply driver ends, including by panic
struct ReopenOnDrop(Arc<Shared>);

impl Drop for ReopenOnDrop {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // The observer may be what panicked; only release the gate
            self.0.set_in_flight(None);
            self.0.gate.open();
        } else {
            self.0.reopen();
        }
    }
}

/// Feed events into the placeholder until a terminal state, persist once,
/// reopen the gate
async fn drive_reply(
    shared: Arc<Shared>,
    mut events: mpsc::Receiver<StreamEvent>,
    placeholder: usize,
    cancel: CancellationToken,
) -> StreamState {
    let _reopen = ReopenOnDrop(Arc::clone(&shared));
    let mut consumer = StreamConsumer::new(placeholder);
    consumer.start(&mut *shared.session.lock().await);

    loop {
        let event = tokio::select! {
            biased;

            _ = cancel.cancelled() => StreamEvent::Error(CirError::Cancelled),

            next = events.recv() => next.unwrap_or_else(|| {
                tracing::debug!("Event channel closed, treating as end of reply");
                StreamEvent::Done
            }),
        };

        let mut session = shared.session.lock().await;
        if consumer.apply(event, &mut session) {
            shared.observer.messages_changed(&session.messages);
        }
        if consumer.state().is_terminal() {
            if let Err(e) = shared.storage.save(&session) {
                tracing::error!("Failed to save session after reply: {:#}", e);
            }
            break;
        }
    }

    // Stops the producer at its next send
    drop(events);
    consumer.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::observer::NullObserver;
    use crate::providers::ServiceMessage;
    use crate::session::YamlSessionStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedReply(&'static [&'static str]);

    #[async_trait]
    impl ChatProvider for FixedReply {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn stream_chat(
            &self,
            _messages: &[ServiceMessage],
        ) -> Result<mpsc::Receiver<StreamEvent>> {
            let (tx, rx) = mpsc::channel(16);
            for chunk in self.0 {
                tx.send(StreamEvent::Chunk(chunk.to_string())).await.unwrap();
            }
            tx.send(StreamEvent::Done).await.unwrap();
            Ok(rx)
        }
    }

    struct NoKey;

    #[async_trait]
    impl ChatProvider for NoKey {
        fn name(&self) -> &str {
            "nokey"
        }

        async fn stream_chat(
            &self,
            _messages: &[ServiceMessage],
        ) -> Result<mpsc::Receiver<StreamEvent>> {
            Err(CirError::MissingCredentials("OPENAI_API_KEY is not set".into()).into())
        }
    }

    fn client(dir: &TempDir, provider: Arc<dyn ChatProvider>) -> ChatClient {
        let storage = Arc::new(YamlSessionStore::new(dir.path().join("session.yaml")));
        ChatClient::open(storage, provider, Arc::new(NullObserver)).unwrap()
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir, Arc::new(FixedReply(&["x"])));

        let outcome = client.submit_question("   \n").await.unwrap();

        assert!(matches!(outcome, Submission::Ignored));
        assert!(client.snapshot().await.messages.is_empty());
        assert!(client.is_input_enabled());
    }

    #[tokio::test]
    async fn test_reply_is_streamed_into_placeholder_and_persisted() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir, Arc::new(FixedReply(&["Hel", "lo"])));
        client.set_input_text("Hi?").await;

        let handle = match client.submit_question("Hi?").await.unwrap() {
            Submission::Started(handle) => handle,
            other => panic!("unexpected submission: {:?}", other),
        };
        assert_eq!(handle.finished().await, StreamState::Completed);

        let session = client.snapshot().await;
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].question, "Hi?");
        assert_eq!(session.messages[0].content, "<question>\nHi?\n</question>");
        assert_eq!(session.messages[1].content, "Hello");
        assert!(session.input_text.is_empty());
        assert!(client.is_input_enabled());

        let reloaded = YamlSessionStore::new(dir.path().join("session.yaml"))
            .load()
            .unwrap();
        assert_eq!(reloaded.messages, session.messages);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_the_reply_not_the_client() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir, Arc::new(NoKey));

        let handle = match client.submit_question("Hi?").await.unwrap() {
            Submission::Started(handle) => handle,
            other => panic!("unexpected submission: {:?}", other),
        };
        assert_eq!(handle.finished().await, StreamState::Failed);

        let session = client.snapshot().await;
        assert_eq!(
            session.messages[1].content,
            "Error: Missing credentials: OPENAI_API_KEY is not set"
        );
        assert!(client.is_input_enabled());
    }

    #[tokio::test]
    async fn test_set_working_files_resets_checksums_and_saves() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir, Arc::new(FixedReply(&[])));

        assert!(client.set_working_files(["a.txt", "b.txt"]).await.unwrap());

        let reloaded = YamlSessionStore::new(dir.path().join("session.yaml"))
            .load()
            .unwrap();
        assert_eq!(reloaded.working_files.len(), 2);
        assert!(reloaded
            .working_files
            .iter()
            .all(|f| f.last_submitted_checksum.is_none()));
    }

    struct PanickingObserver;

    impl ChatObserver for PanickingObserver {
        fn messages_changed(&self, messages: &[crate::session::Message]) {
            if messages.last().map(|m| m.content.as_str()) == Some("boom") {
                panic!("observer failed");
            }
        }
    }

    #[tokio::test]
    async fn test_driver_panic_reopens_input() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(YamlSessionStore::new(dir.path().join("session.yaml")));
        let client = ChatClient::open(
            storage,
            Arc::new(FixedReply(&["boom"])),
            Arc::new(PanickingObserver),
        )
        .unwrap();

        let handle = match client.submit_question("Hi?").await.unwrap() {
            Submission::Started(handle) => handle,
            other => panic!("unexpected submission: {:?}", other),
        };
        assert_eq!(handle.finished().await, StreamState::Failed);

        assert!(client.is_input_enabled());
        assert!(!client.cancel());
        assert!(matches!(
            client.submit_question("again?").await.unwrap(),
            Submission::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_without_request_is_noop() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir, Arc::new(FixedReply(&[])));
        assert!(!client.cancel());
    }
}
