//! Tracking of running label tasks and secondary latent work.

use crate::runtime::{TaskHandle, TimerHandle};
use std::cell::RefCell;
use std::fmt;

type Liveness = Box<dyn Fn() -> bool>;

/// Stored cancellation for one unit of secondary latent work.
///
/// A canceller is stale once the work it guards has finished on its own;
/// stale cancellers are swept without being invoked.
pub struct LatentCanceller {
    cancel: Option<Box<dyn FnOnce()>>,
    liveness: Option<Liveness>,
}

impl LatentCanceller {
    /// Canceller that stays live until it is invoked.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            liveness: None,
        }
    }

    /// Canceller that goes stale as soon as `liveness` returns false.
    pub fn with_liveness(
        cancel: impl FnOnce() + 'static,
        liveness: impl Fn() -> bool + 'static,
    ) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            liveness: Some(Box::new(liveness)),
        }
    }

    pub fn for_timer(timer: TimerHandle) -> Self {
        let probe = timer.clone();
        Self::with_liveness(
            move || {
                timer.cancel();
            },
            move || probe.is_pending(),
        )
    }

    pub fn for_task(task: TaskHandle) -> Self {
        let probe = task.clone();
        Self::with_liveness(move || task.cancel(), move || !probe.is_done())
    }

    pub fn is_bound(&self) -> bool {
        self.cancel.is_some() && self.liveness.as_ref().map_or(true, |alive| alive())
    }

    /// Invoke the cancellation if the record is still live.
    pub fn execute_if_bound(mut self) -> bool {
        if !self.is_bound() {
            return false;
        }
        match self.cancel.take() {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for LatentCanceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatentCanceller")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Per-state set of running label tasks and latent cancellers.
///
/// No borrow is held while user cancellation callbacks run, so callbacks
/// may register new latent work on the same tracker.
#[derive(Default, Debug)]
pub struct LatentTaskTracker {
    labels: RefCell<Vec<TaskHandle>>,
    cancellers: RefCell<Vec<LatentCanceller>>,
}

impl LatentTaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a started label task. Handles are only released all at once,
    /// by `stop_labels`.
    pub fn track_label(&self, handle: TaskHandle) {
        self.labels.borrow_mut().push(handle);
    }

    pub fn add_canceller(&self, canceller: LatentCanceller) {
        self.cancellers.borrow_mut().push(canceller);
    }

    /// Label tasks that have not finished yet.
    pub fn running_labels(&self) -> usize {
        self.labels
            .borrow()
            .iter()
            .filter(|handle| !handle.is_done())
            .count()
    }

    pub fn label_handles(&self) -> Vec<TaskHandle> {
        self.labels.borrow().clone()
    }

    pub fn latent_records(&self) -> usize {
        self.cancellers.borrow().len()
    }

    /// Cancel and forget every tracked label task. Returns how many had not
    /// finished.
    pub fn stop_labels(&self) -> usize {
        let handles = std::mem::take(&mut *self.labels.borrow_mut());
        let mut stopped = 0;
        for handle in &handles {
            handle.cancel();
            if !handle.is_done() {
                stopped += 1;
            }
        }
        stopped
    }

    /// Invoke and forget every latent canceller. Returns how many were live.
    pub fn stop_latent(&self) -> usize {
        let cancellers = std::mem::take(&mut *self.cancellers.borrow_mut());
        cancellers
            .into_iter()
            .map(LatentCanceller::execute_if_bound)
            .filter(|executed| *executed)
            .count()
    }

    /// Drop cancellers whose work already finished. Returns how many.
    pub fn clear_invalid(&self) -> usize {
        let mut cancellers = self.cancellers.borrow_mut();
        let before = cancellers.len();
        cancellers.retain(LatentCanceller::is_bound);
        before - cancellers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{TaskStatus, TimerQueue};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn stop_labels_counts_unfinished_and_clears() {
        let tracker = LatentTaskTracker::new();
        let finished = TaskHandle::new(1, "done");
        finished.finish(TaskStatus::Completed);
        let running = TaskHandle::new(2, "running");
        tracker.track_label(finished);
        tracker.track_label(running.clone());

        assert_eq!(tracker.label_handles().len(), 2);
        assert_eq!(tracker.running_labels(), 1);
        assert_eq!(tracker.stop_labels(), 1);
        assert!(running.is_cancelled());
        assert_eq!(tracker.stop_labels(), 0);
        assert!(tracker.label_handles().is_empty());
    }

    #[test]
    fn stop_latent_invokes_live_cancellers_once() {
        let tracker = LatentTaskTracker::new();
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        tracker.add_canceller(LatentCanceller::new(move || seen.set(seen.get() + 1)));
        tracker.add_canceller(LatentCanceller::with_liveness(|| {}, || false));

        assert_eq!(tracker.stop_latent(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(tracker.latent_records(), 0);
        assert_eq!(tracker.stop_latent(), 0);
    }

    #[test]
    fn clear_invalid_removes_fired_timers() {
        let queue = TimerQueue::new();
        let tracker = LatentTaskTracker::new();
        tracker.add_canceller(LatentCanceller::for_timer(queue.schedule_after(0.0, 1.0, || {})));
        tracker.add_canceller(LatentCanceller::for_timer(queue.schedule_after(0.0, 9.0, || {})));

        queue.fire_due(1.0);
        assert_eq!(tracker.clear_invalid(), 1);
        assert_eq!(tracker.latent_records(), 1);
        assert_eq!(tracker.stop_latent(), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn canceller_may_register_more_work_while_stopping() {
        let tracker = Rc::new(LatentTaskTracker::new());
        let inner = Rc::clone(&tracker);
        tracker.add_canceller(LatentCanceller::new(move || {
            inner.add_canceller(LatentCanceller::new(|| {}));
        }));

        assert_eq!(tracker.stop_latent(), 1);
        assert_eq!(tracker.latent_records(), 1);
    }

    #[test]
    fn task_canceller_goes_stale_when_task_finishes() {
        let task = TaskHandle::new(3, "secondary");
        let canceller = LatentCanceller::for_task(task.clone());
        assert!(canceller.is_bound());

        task.finish(TaskStatus::Completed);
        assert!(!canceller.is_bound());
        assert!(!canceller.execute_if_bound());
    }
}
