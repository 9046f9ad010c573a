//! Live batch progress published over a `watch` channel
//!
//! The orchestrators write, the presentation layer subscribes and renders the
//! latest snapshot. Lagging receivers only ever see the newest value.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::{BatchProgress, CancelOutcome};

pub type ProgressReceiver = watch::Receiver<BatchProgress>;

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<BatchProgress>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BatchProgress::default());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn subscribe(&self) -> ProgressReceiver {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> BatchProgress {
        self.tx.borrow().clone()
    }

    /// Resets every counter for a new batch of `total` tasks
    pub fn start(&self, total: usize) {
        self.tx.send_replace(BatchProgress::new(total));
    }

    pub fn set_current(&self, label: impl Into<String>) {
        let label = label.into();
        self.tx.send_modify(|p| p.current_label = label);
    }

    /// Counts one settled task
    pub fn record(&self, success: bool, label: impl Into<String>) {
        let label = label.into();
        self.tx.send_modify(|p| {
            p.completed += 1;
            if !success {
                p.failed += 1;
            }
            p.current_label = label;
        });
    }

    pub fn set_results(&self, results: Vec<CancelOutcome>) {
        self.tx.send_modify(|p| p.results = results);
    }

    pub fn clear(&self) {
        self.tx.send_replace(BatchProgress::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_settled_tasks() {
        let tracker = ProgressTracker::new();
        tracker.start(3);
        tracker.record(true, "1234567890");
        tracker.record(false, "1234567891");

        let progress = tracker.snapshot();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.succeeded(), 1);
        assert_eq!(progress.current_label, "1234567891");

        tracker.start(1);
        assert_eq!(tracker.snapshot(), BatchProgress::new(1));
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();

        tracker.start(2);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().total, 2);

        tracker.record(true, "done");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().completed, 1);
    }
}
