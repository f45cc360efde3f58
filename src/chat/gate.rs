//! Single in-flight input gate
//!
//! The gate is open while the client is idle. Submitting a question closes
//! it atomically; the stream driver reopens it after the terminal event
//! has been persisted. A closed gate makes further submissions no-ops.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared open/closed flag with async waiting
#[derive(Debug, Clone)]
pub struct InputGate {
    state: Arc<watch::Sender<bool>>,
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InputGate {
    /// Create an open gate
    pub fn new() -> Self {
        let (state, _) = watch::channel(true);
        Self {
            state: Arc::new(state),
        }
    }

    /// Whether submissions are currently accepted
    pub fn is_enabled(&self) -> bool {
        *self.state.borrow()
    }

    /// Close the gate if it is open
    ///
    /// Returns true only for the caller that performed the transition.
    pub fn try_close(&self) -> bool {
        self.state.send_if_modified(|open| {
            if *open {
                *open = false;
                true
            } else {
                false
            }
        })
    }

    /// Reopen the gate and wake every waiter
    pub fn open(&self) {
        self.state.send_replace(true);
    }

    /// Wait until the gate is open
    pub async fn wait_enabled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|open| *open).await;
    }
}
