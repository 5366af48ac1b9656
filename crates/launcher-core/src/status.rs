//! Status and progress reporting.
//!
//! Every step reports through a [`StatusSender`]. Events land in a single
//! channel drained by exactly one consumer, which owns all display state.

use tokio::sync::mpsc;

/// A status line with optional progress percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Human-readable status.
    pub message: String,
    /// Progress from 0 to 100, when known.
    pub progress: Option<u8>,
}

impl StatusEvent {
    /// Status without progress.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            progress: None,
        }
    }

    /// Status with progress (clamped to 100).
    pub fn progress(message: impl Into<String>, progress: u8) -> Self {
        Self {
            message: message.into(),
            progress: Some(progress.min(100)),
        }
    }
}

/// Sending half of the status channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSender {
    /// A sender that drops everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sends an event. A closed channel is ignored.
    pub fn send(&self, event: StatusEvent) {
        tracing::debug!(progress = ?event.progress, "{}", event.message);
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Sends a plain status line.
    pub fn status(&self, message: impl Into<String>) {
        self.send(StatusEvent::message(message));
    }

    /// Sends a status line with progress.
    pub fn progress(&self, message: impl Into<String>, progress: u8) {
        self.send(StatusEvent::progress(message, progress));
    }
}

/// Receiving half, owned by the single display context.
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Creates a status channel.
#[must_use]
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender { tx: Some(tx) }, rx)
}
