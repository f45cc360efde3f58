//! Session persistence
//!
//! [`SessionStorage`] is the seam the chat client persists through; the
//! production implementation is a single human-readable YAML file.

use crate::error::{CirError, Result};
use crate::session::schema;
use crate::session::WorkingSession;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Load and save a working session
pub trait SessionStorage: Send + Sync {
    /// Load the stored session, creating an empty one if none exists
    fn load(&self) -> Result<WorkingSession>;

    /// Overwrite the stored session with `session`
    ///
    /// Transient file content is never written.
    fn save(&self, session: &WorkingSession) -> Result<()>;
}

/// Session stored as a YAML document at a fixed path
#[derive(Debug, Clone)]
pub struct YamlSessionStore {
    path: PathBuf,
}

impl YamlSessionStore {
    /// Create a store for the session file at `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use cir::session::{SessionStorage, YamlSessionStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = YamlSessionStore::new(dir.path().join("session.yaml"));
    /// let session = store.load().unwrap();
    /// assert!(session.messages.is_empty());
    /// ```
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create session directory")
                    .map_err(|e| CirError::Storage(format!("{:#}", e)))?;
            }
        }
        Ok(())
    }
}

impl SessionStorage for YamlSessionStore {
    fn load(&self) -> Result<WorkingSession> {
        self.ensure_parent()?;

        if !self.path.exists() {
            tracing::info!("No session at {}, creating one", self.path.display());
            let session = WorkingSession::new();
            self.save(&session)?;
            return Ok(session);
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let session = schema::decode(&raw)?;
        tracing::debug!(
            "Loaded session from {} ({} messages, {} working files)",
            self.path.display(),
            session.messages.len(),
            session.working_files.len()
        );
        Ok(session)
    }

    fn save(&self, session: &WorkingSession) -> Result<()> {
        self.ensure_parent()?;
        let mut stored = session.clone();
        stored.clear_file_contents();
        let yaml = schema::encode(&stored)?;
        std::fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))
            .map_err(|e| CirError::Storage(format!("{:#}", e)))?;
        tracing::debug!("Saved session to {}", self.path.display());
        Ok(())
    }
}
