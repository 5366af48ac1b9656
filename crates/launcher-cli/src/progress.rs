//! Terminal rendering of launcher status events.
//!
//! One task owns the progress bar and drains the status channel; the
//! workers only ever hold a [`launcher_core::StatusSender`].

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use launcher_core::{StatusEvent, StatusReceiver};
use tokio::task::JoinHandle;

/// Progress bar state driven by [`StatusEvent`]s.
pub struct StatusDisplay {
    bar: ProgressBar,
    position: u64,
}

impl StatusDisplay {
    /// A display drawing to stderr (hidden when stderr is not a terminal).
    pub fn stderr() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            Some(100),
            ProgressDrawTarget::stderr(),
        ))
    }

    /// A display that draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_length(100);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar, position: 0 }
    }

    /// Applies one event. Progress never moves backwards.
    pub fn apply(&mut self, event: &StatusEvent) {
        if let Some(progress) = event.progress {
            self.position = self.position.max(u64::from(progress.min(100)));
            self.bar.set_position(self.position);
        } else {
            self.bar.tick();
        }
        self.bar.set_message(event.message.clone());
    }

    /// Current percentage.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Last status line.
    pub fn message(&self) -> String {
        self.bar.message()
    }

    /// Removes the bar from the terminal.
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// Drains `events` into `display` until every sender is dropped.
pub async fn drain(mut events: StatusReceiver, mut display: StatusDisplay) -> StatusDisplay {
    while let Some(event) = events.recv().await {
        display.apply(&event);
    }
    display
}

/// Spawns the display task on the current runtime.
pub fn spawn_display(events: StatusReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        drain(events, StatusDisplay::stderr()).await.finish();
    })
}
