//! Last-error signal.

use std::sync::Arc;
use tokio::sync::watch;

/// Holds the most recent error message.
///
/// Each new error overwrites the previous one; nothing is queued. Cloning
/// shares the same underlying slot.
#[derive(Clone)]
pub struct ErrorSignal {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ErrorSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current message.
    pub fn raise(&self, message: impl Into<String>) {
        self.tx.send_replace(Some(message.into()));
    }

    /// Clear the current message.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Current message, if any.
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for ErrorSignal {
    fn default() -> Self {
        Self::new()
    }
}
