use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};

use cir::chat::{ChatClient, ChatObserver};
use cir::error::{CirError, Result};
use cir::providers::{ChatProvider, ServiceMessage, StreamEvent};
use cir::session::{Message, SessionStorage, WorkingSession};

/// One step of a scripted reply
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Scripted {
    Chunk(&'static str),
    Done,
    NetworkError(&'static str),
    ProtocolError(&'static str),
    /// Wait for `ScriptedProvider::release` before continuing
    Pause,
}

/// Provider that replays a fixed script for every request and records the
/// history it was asked to answer
#[allow(dead_code)]
pub struct ScriptedProvider {
    script: Vec<Scripted>,
    release: Arc<Notify>,
    requests: Mutex<Vec<Vec<ServiceMessage>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script,
            release: Arc::new(Notify::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(chunks: &[&'static str]) -> Arc<Self> {
        let mut script: Vec<Scripted> = chunks.iter().map(|c| Scripted::Chunk(*c)).collect();
        script.push(Scripted::Done);
        Self::new(script)
    }

    /// Let a paused script continue
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn requests(&self) -> Vec<Vec<ServiceMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(&self, messages: &[ServiceMessage]) -> Result<mpsc::Receiver<StreamEvent>> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let (tx, rx) = mpsc::channel(8);
        let script = self.script.clone();
        let release = Arc::clone(&self.release);
        tokio::spawn(async move {
            for step in script {
                let event = match step {
                    Scripted::Chunk(text) => StreamEvent::Chunk(text.to_string()),
                    Scripted::Done => StreamEvent::Done,
                    Scripted::NetworkError(msg) => StreamEvent::Error(CirError::Network(msg.into())),
                    Scripted::ProtocolError(msg) => {
                        StreamEvent::Error(CirError::Protocol(msg.into()))
                    }
                    Scripted::Pause => {
                        release.notified().await;
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// In-memory storage that counts saves and can be told to fail them
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingStorage {
    stored: Mutex<Option<WorkingSession>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

#[allow(dead_code)]
impl CountingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_session(session: WorkingSession) -> Arc<Self> {
        let storage = Self::default();
        *storage.stored.lock().unwrap() = Some(session);
        Arc::new(storage)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Option<WorkingSession> {
        self.stored.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl SessionStorage for CountingStorage {
    fn load(&self) -> Result<WorkingSession> {
        Ok(self.stored().unwrap_or_default())
    }

    fn save(&self, session: &WorkingSession) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CirError::Storage("disk full".into()).into());
        }
        let mut copy = session.clone();
        copy.clear_file_contents();
        *self.stored.lock().unwrap() = Some(copy);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Observer that records every notification
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingObserver {
    pub renders: AtomicUsize,
    pub last_messages: Mutex<Vec<Message>>,
    pub input_changes: Mutex<Vec<bool>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn input_changes(&self) -> Vec<bool> {
        self.input_changes.lock().unwrap().clone()
    }
}

impl ChatObserver for RecordingObserver {
    fn messages_changed(&self, messages: &[Message]) {
        self.renders.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
    }

    fn input_enabled_changed(&self, enabled: bool) {
        self.input_changes.lock().unwrap().push(enabled);
    }
}

/// Poll until the message at `index` has exactly `expected` content
#[allow(dead_code)]
pub async fn wait_for_content(client: &ChatClient, index: usize, expected: &str) {
    let poll = async {
        loop {
            let session = client.snapshot().await;
            if session.messages.get(index).map(|m| m.content.as_str()) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("message {} never became {:?}", index, expected));
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
