//! Delayed callbacks fired by the tick loop.

use super::clock::Clock;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerStatus {
    Pending,
    Fired,
    Cancelled,
}

struct TimerEntry {
    id: u64,
    deadline: f64,
    status: Cell<TimerStatus>,
    callback: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Handle to a scheduled timer.
#[derive(Clone)]
pub struct TimerHandle {
    entry: Rc<TimerEntry>,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.entry.id
    }

    pub fn deadline(&self) -> f64 {
        self.entry.deadline
    }

    pub fn status(&self) -> TimerStatus {
        self.entry.status.get()
    }

    pub fn is_pending(&self) -> bool {
        self.status() == TimerStatus::Pending
    }

    /// Cancel the timer. Returns true if it was still pending.
    pub fn cancel(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.entry.status.set(TimerStatus::Cancelled);
        let callback = self.entry.callback.borrow_mut().take();
        drop(callback);
        true
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.entry.id)
            .field("deadline", &self.entry.deadline)
            .field("status", &self.entry.status.get())
            .finish()
    }
}

/// Queue of callbacks ordered by deadline.
#[derive(Default)]
pub struct TimerQueue {
    next_id: Cell<u64>,
    entries: RefCell<Vec<Rc<TimerEntry>>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run once the clock reaches `now + delay`.
    pub fn schedule_after(
        &self,
        now: f64,
        delay: f64,
        callback: impl FnOnce() + 'static,
    ) -> TimerHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let entry = Rc::new(TimerEntry {
            id,
            deadline: now + delay.max(0.0),
            status: Cell::new(TimerStatus::Pending),
            callback: RefCell::new(Some(Box::new(callback))),
        });
        self.entries.borrow_mut().push(Rc::clone(&entry));
        TimerHandle { entry }
    }

    /// Fire every pending timer whose deadline is at or before `now`, in
    /// deadline order. Callbacks may schedule or cancel other timers.
    pub fn fire_due(&self, now: f64) -> usize {
        let mut due: Vec<Rc<TimerEntry>> = Vec::new();
        self.entries.borrow_mut().retain(|entry| {
            if entry.status.get() != TimerStatus::Pending {
                return false;
            }
            if entry.deadline <= now {
                due.push(Rc::clone(entry));
                return false;
            }
            true
        });
        due.sort_by(|a, b| a.deadline.total_cmp(&b.deadline).then(a.id.cmp(&b.id)));

        let mut fired = 0;
        for entry in due {
            if entry.status.get() != TimerStatus::Pending {
                continue;
            }
            entry.status.set(TimerStatus::Fired);
            let callback = entry.callback.borrow_mut().take();
            if let Some(callback) = callback {
                callback();
                fired += 1;
            }
        }
        fired
    }

    pub fn pending(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.status.get() == TimerStatus::Pending)
            .count()
    }
}

/// Future resolving once a clock reaches a deadline.
#[must_use = "futures do nothing unless awaited"]
pub struct Delay {
    clock: Rc<dyn Clock>,
    seconds: f64,
    deadline: Option<f64>,
}

impl Delay {
    pub fn new(clock: Rc<dyn Clock>, seconds: f64) -> Self {
        Self {
            clock,
            seconds,
            deadline: None,
        }
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let now = self.clock.now();
        let seconds = self.seconds;
        let deadline = *self.deadline.get_or_insert(now + seconds);
        if now >= deadline {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let queue = TimerQueue::new();
        let log = recorder();
        let (late, early) = (Rc::clone(&log), Rc::clone(&log));
        queue.schedule_after(0.0, 2.0, move || late.borrow_mut().push("late"));
        queue.schedule_after(0.0, 1.0, move || early.borrow_mut().push("early"));

        assert_eq!(queue.fire_due(0.5), 0);
        assert_eq!(queue.fire_due(2.0), 2);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let queue = TimerQueue::new();
        let log = recorder();
        let seen = Rc::clone(&log);
        let handle = queue.schedule_after(0.0, 1.0, move || seen.borrow_mut().push("fired"));

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(queue.fire_due(5.0), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(handle.status(), TimerStatus::Cancelled);
    }

    #[test]
    fn fired_timer_cannot_be_cancelled() {
        let queue = TimerQueue::new();
        let handle = queue.schedule_after(0.0, 0.0, || {});
        queue.fire_due(0.0);
        assert_eq!(handle.status(), TimerStatus::Fired);
        assert!(!handle.cancel());
    }

    #[test]
    fn callback_may_schedule_another_timer() {
        let queue = Rc::new(TimerQueue::new());
        let log = recorder();
        let (inner_queue, inner_log) = (Rc::clone(&queue), Rc::clone(&log));
        queue.schedule_after(0.0, 1.0, move || {
            let chained = Rc::clone(&inner_log);
            inner_queue.schedule_after(1.0, 1.0, move || chained.borrow_mut().push("chained"));
        });

        queue.fire_due(1.0);
        assert_eq!(queue.pending(), 1);
        queue.fire_due(2.0);
        assert_eq!(*log.borrow(), vec!["chained"]);
    }
}
