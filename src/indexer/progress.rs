//! Done/total accounting for queued work
//!
//! Queues grow the total when they accept new work and shrink it when pending
//! work is withdrawn; the scheduler bumps the done count as tasks finish. Every
//! change is published synchronously to the sink.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

/// Snapshot of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

/// Receives every counter change; called with the counter locked
pub type ProgressSink = Box<dyn Fn(Progress) + Send + Sync>;

// ============================================================================
// ProgressCounter
// ============================================================================

pub struct ProgressCounter {
    state: Mutex<Progress>,
    sink: Option<ProgressSink>,
}

impl ProgressCounter {
    /// Counter without a sink
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Progress::default()),
            sink: None,
        }
    }

    /// Counter publishing to a callback
    ///
    /// The callback runs while the counter is locked and must not call back
    /// into it.
    pub fn with_sink(sink: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(Progress::default()),
            sink: Some(Box::new(sink)),
        }
    }

    /// Counter publishing over a channel; a closed receiver is ignored
    pub fn with_sender(sender: mpsc::UnboundedSender<Progress>) -> Self {
        Self::with_sink(move |progress| {
            let _ = sender.send(progress);
        })
    }

    pub fn add_total(&self, count: u64) {
        self.update(|progress| progress.total += count, count);
    }

    /// Withdraw pending work that will never be done
    pub fn remove_total(&self, count: u64) {
        self.update(
            |progress| progress.total = progress.total.saturating_sub(count),
            count,
        );
    }

    pub fn add_progress(&self, count: u64) {
        self.update(
            |progress| progress.done = (progress.done + count).min(progress.total),
            count,
        );
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        if *state == Progress::default() {
            return;
        }
        *state = Progress::default();
        self.publish(*state);
    }

    pub fn progress(&self) -> Progress {
        *self.state.lock()
    }

    fn update(&self, change: impl FnOnce(&mut Progress), count: u64) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        change(&mut state);
        self.publish(*state);
    }

    fn publish(&self, progress: Progress) {
        trace!(
            "ProgressCounter: {}/{}",
            progress.done, progress.total
        );
        if let Some(sink) = &self.sink {
            sink(progress);
        }
    }
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recording_counter() -> (ProgressCounter, Arc<Mutex<Vec<Progress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let counter = ProgressCounter::with_sink(move |progress| sink_events.lock().push(progress));
        (counter, events)
    }

    #[test]
    fn test_changes_are_published() {
        let (counter, events) = recording_counter();

        counter.add_total(3);
        counter.add_progress(1);
        counter.remove_total(1);

        assert_eq!(
            *events.lock(),
            vec![
                Progress { done: 0, total: 3 },
                Progress { done: 1, total: 3 },
                Progress { done: 1, total: 2 },
            ]
        );
    }

    #[test]
    fn test_zero_counts_publish_nothing() {
        let (counter, events) = recording_counter();

        counter.add_total(0);
        counter.remove_total(0);
        counter.add_progress(0);
        counter.clear();

        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_done_never_exceeds_total() {
        let counter = ProgressCounter::new();
        counter.add_total(1);
        counter.add_progress(2);

        assert_eq!(counter.progress(), Progress { done: 1, total: 1 });
    }

    #[test]
    fn test_clear_resets_counts() {
        let (counter, events) = recording_counter();
        counter.add_total(2);

        counter.clear();

        assert_eq!(counter.progress(), Progress::default());
        assert_eq!(events.lock().last(), Some(&Progress::default()));
    }

    #[tokio::test]
    async fn test_sender_publishes_to_channel() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let counter = ProgressCounter::with_sender(sender);

        counter.add_total(4);

        assert_eq!(receiver.recv().await, Some(Progress { done: 0, total: 4 }));
    }
}
