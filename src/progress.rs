//! Observable sync progress.
//!
//! A single [`ProgressTracker`] owns the state. Every mutation goes through
//! `watch::Sender::send_modify`, which serializes concurrent writers and
//! notifies subscribers; readers take a snapshot or hold a receiver.

use tokio::sync::watch;

/// Snapshot of the updater's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateState {
    pub checked_for_update: bool,
    pub updating: bool,
    pub current_iterations: u64,
    pub total_iterations: u64,
}

#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<UpdateState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(UpdateState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> UpdateState {
        *self.tx.borrow()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.tx.subscribe()
    }

    /// Back to all-false / zero.
    pub fn reset(&self) {
        self.tx.send_modify(|state| *state = UpdateState::default());
    }

    pub fn set_checked(&self, checked: bool) {
        self.tx.send_modify(|state| state.checked_for_update = checked);
    }

    pub fn set_updating(&self, updating: bool) {
        self.tx.send_modify(|state| state.updating = updating);
    }

    pub fn set_total(&self, total: u64) {
        self.tx.send_modify(|state| {
            state.total_iterations = total;
            state.current_iterations = state.current_iterations.min(total);
        });
    }

    /// Count one finished unit of work. Never exceeds the total.
    pub fn increment(&self) -> UpdateState {
        let mut published = UpdateState::default();
        self.tx.send_modify(|state| {
            if state.current_iterations < state.total_iterations {
                state.current_iterations += 1;
            }
            published = *state;
        });
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_idle() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.snapshot(), UpdateState::default());
    }

    #[test]
    fn test_increment_is_clamped_to_total() {
        let tracker = ProgressTracker::new();
        tracker.set_total(2);
        tracker.increment();
        tracker.increment();
        let state = tracker.increment();
        assert_eq!(state.current_iterations, 2);
        assert_eq!(state.total_iterations, 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let tracker = ProgressTracker::new();
        tracker.set_checked(true);
        tracker.set_updating(true);
        tracker.set_total(5);
        tracker.increment();
        tracker.reset();
        assert_eq!(tracker.snapshot(), UpdateState::default());
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        tracker.set_total(3);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().total_iterations, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.set_total(200);
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker.increment();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(tracker.snapshot().current_iterations, 200);
    }
}
