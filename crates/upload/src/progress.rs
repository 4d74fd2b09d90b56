//! Progress reporting to the upload's consumer.

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::UploadEvent;

/// `round(100 * acknowledged / total)`, halves rounded up.
pub fn progress_percent(acknowledged: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let total = u64::from(total);
    let acknowledged = u64::from(acknowledged).min(total);
    ((200 * acknowledged + total) / (2 * total)) as u8
}

/// Pushes [`UploadEvent`]s to the consumer's channel.
///
/// Emitted percentages never decrease and stay within `0..=100`. Exactly
/// one terminal event is delivered; anything after it is dropped.
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<UploadEvent>,
    last_percent: u8,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::UnboundedSender<UploadEvent>) -> Self {
        Self {
            tx,
            last_percent: 0,
            finished: false,
        }
    }

    /// Reports progress after a newly acknowledged part.
    pub fn progress(&mut self, percent: u8, message: impl Into<String>) {
        if self.finished {
            debug!(percent, "progress after terminal event dropped");
            return;
        }
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        self.send(UploadEvent::Progress {
            percent,
            message: message.into(),
        });
    }

    /// Reports that the object was assembled at `location`.
    pub fn succeeded(&mut self, location: impl Into<String>) {
        self.finish(UploadEvent::Succeeded {
            location: location.into(),
        });
    }

    /// Reports that the session was aborted.
    pub fn failed(&mut self, reason: impl Into<String>) {
        self.finish(UploadEvent::Failed {
            reason: reason.into(),
        });
    }

    /// Whether the terminal event was already delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Highest percentage reported so far.
    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    fn finish(&mut self, event: UploadEvent) {
        if self.finished {
            debug!(?event, "second terminal event dropped");
            return;
        }
        self.finished = true;
        self.send(event);
    }

    fn send(&self, event: UploadEvent) {
        // A consumer that stopped listening is not an upload failure.
        let _ = self.tx.send(event);
    }
}
