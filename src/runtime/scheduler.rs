//! Tick-driven cooperative scheduler.
//!
//! Every live task is polled at most once per tick, from the thread that
//! drives the tick. Wakers are not used for readiness: a pending task is
//! simply polled again on the following tick.
//!
//! A routine returning `Err` is recorded as failed and the tick goes on. A
//! routine that panics is recorded as failed too, then the panic is resumed
//! so it reaches whoever drives the tick.

use super::task::{LocalTask, TaskError, TaskHandle, TaskStatus};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

struct TickWaker;

impl Wake for TickWaker {
    fn wake(self: Arc<Self>) {}
}

struct TaskSlot {
    handle: TaskHandle,
    future: RefCell<Option<LocalTask>>,
    last_polled: Cell<Option<u64>>,
}

impl TaskSlot {
    fn poll(&self, tick: u64, cx: &mut Context<'_>) {
        self.last_polled.set(Some(tick));
        if self.handle.is_done() {
            return;
        }

        let Some(mut future) = self.future.borrow_mut().take() else {
            return;
        };

        if self.handle.is_cancelled() {
            drop(future);
            self.handle.finish(TaskStatus::Cancelled);
            return;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(cx))) {
            Ok(Poll::Pending) => {
                if self.handle.is_cancelled() {
                    drop(future);
                    self.handle.finish(TaskStatus::Cancelled);
                } else {
                    *self.future.borrow_mut() = Some(future);
                }
            }
            Ok(Poll::Ready(Ok(()))) => {
                tracing::trace!(task = self.handle.name(), "task completed");
                self.handle.finish(TaskStatus::Completed);
            }
            Ok(Poll::Ready(Err(error))) => {
                tracing::warn!(task = self.handle.name(), %error, "task failed");
                self.handle.finish(TaskStatus::Failed(error));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(task = self.handle.name(), panic = %message, "task panicked");
                drop(future);
                self.handle
                    .finish(TaskStatus::Failed(TaskError::Panicked(message)));
                panic::resume_unwind(payload);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Single-threaded scheduler advanced one tick at a time.
pub struct Scheduler {
    ticks: Rc<Cell<u64>>,
    next_id: Cell<u64>,
    slots: RefCell<Vec<Rc<TaskSlot>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            ticks: Rc::new(Cell::new(0)),
            next_id: Cell::new(1),
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Number of ticks started so far.
    pub fn current_tick(&self) -> u64 {
        self.ticks.get()
    }

    /// Start a new tick and return its number.
    pub fn begin_tick(&self) -> u64 {
        let tick = self.ticks.get() + 1;
        self.ticks.set(tick);
        tick
    }

    /// Queue a routine. It is first polled by the next `run_tick`.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> TaskHandle
    where
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        self.spawn_boxed(name, Box::pin(future))
    }

    pub fn spawn_boxed(&self, name: impl Into<String>, future: LocalTask) -> TaskHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = TaskHandle::new(id, name);
        tracing::trace!(task = handle.name(), id, "task spawned");
        self.slots.borrow_mut().push(Rc::new(TaskSlot {
            handle: handle.clone(),
            future: RefCell::new(Some(future)),
            last_polled: Cell::new(None),
        }));
        handle
    }

    /// Poll every task that has not been polled during the current tick,
    /// including tasks spawned while this pass runs. Returns the number of
    /// polls performed.
    pub fn run_tick(&self) -> usize {
        let tick = self.ticks.get();
        let waker = Waker::from(Arc::new(TickWaker));
        let mut cx = Context::from_waker(&waker);
        let mut polled = 0;

        loop {
            let due: Vec<Rc<TaskSlot>> = self
                .slots
                .borrow()
                .iter()
                .filter(|slot| slot.last_polled.get() != Some(tick))
                .cloned()
                .collect();
            if due.is_empty() {
                break;
            }
            for slot in due {
                slot.poll(tick, &mut cx);
                polled += 1;
            }
        }

        self.slots.borrow_mut().retain(|slot| !slot.handle.is_done());
        polled
    }

    /// Number of tasks that have not finished yet.
    pub fn live_tasks(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| !slot.handle.is_done())
            .count()
    }

    /// Future resolving on the tick after the one it is first polled in.
    pub fn next_tick(&self) -> NextTick {
        self.wait_ticks(1)
    }

    /// Future resolving `ticks` ticks after the one it is first polled in.
    pub fn wait_ticks(&self, ticks: u64) -> NextTick {
        NextTick {
            ticks: Rc::clone(&self.ticks),
            delay: ticks,
            target: None,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Suspension primitive yielding to a later tick.
#[must_use = "futures do nothing unless awaited"]
pub struct NextTick {
    ticks: Rc<Cell<u64>>,
    delay: u64,
    target: Option<u64>,
}

impl Future for NextTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let now = self.ticks.get();
        let delay = self.delay;
        let target = *self.target.get_or_insert(now + delay);
        if now >= target {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn spawned_task_runs_on_first_tick() {
        let scheduler = Scheduler::new();
        let hits = counter();
        let seen = Rc::clone(&hits);
        let handle = scheduler.spawn("once", async move {
            seen.set(seen.get() + 1);
            Ok(())
        });

        assert_eq!(hits.get(), 0);
        scheduler.begin_tick();
        scheduler.run_tick();

        assert_eq!(hits.get(), 1);
        assert_eq!(handle.status(), TaskStatus::Completed);
        assert_eq!(scheduler.live_tasks(), 0);
    }

    #[test]
    fn next_tick_suspends_until_following_tick() {
        let scheduler = Rc::new(Scheduler::new());
        let stage = counter();
        let (seen, inner) = (Rc::clone(&stage), Rc::clone(&scheduler));
        let handle = scheduler.spawn("yielding", async move {
            seen.set(1);
            inner.next_tick().await;
            seen.set(2);
            Ok(())
        });

        scheduler.begin_tick();
        scheduler.run_tick();
        assert_eq!(stage.get(), 1);
        assert!(!handle.is_done());

        scheduler.run_tick();
        assert_eq!(stage.get(), 1, "no second poll within the same tick");

        scheduler.begin_tick();
        scheduler.run_tick();
        assert_eq!(stage.get(), 2);
        assert!(handle.is_done());
    }

    #[test]
    fn cancelled_task_is_dropped_at_next_poll() {
        let scheduler = Rc::new(Scheduler::new());
        let stage = counter();
        let (seen, inner) = (Rc::clone(&stage), Rc::clone(&scheduler));
        let handle = scheduler.spawn("cancellable", async move {
            inner.next_tick().await;
            seen.set(99);
            Ok(())
        });

        scheduler.begin_tick();
        scheduler.run_tick();
        handle.cancel();
        assert!(!handle.is_done());

        scheduler.begin_tick();
        scheduler.run_tick();
        assert_eq!(handle.status(), TaskStatus::Cancelled);
        assert_eq!(stage.get(), 0);
    }

    #[test]
    fn failing_task_reports_failure() {
        let scheduler = Scheduler::new();
        let handle = scheduler.spawn("failing", async { Err(TaskError::msg("no target")) });

        scheduler.begin_tick();
        scheduler.run_tick();

        assert_eq!(
            handle.status(),
            TaskStatus::Failed(TaskError::msg("no target"))
        );
    }

    #[test]
    fn panicking_task_is_recorded_then_resumed() {
        let scheduler = Scheduler::new();
        let handle = scheduler.spawn("panicking", async {
            if true {
                panic!("label exploded");
            }
            Ok(())
        });

        scheduler.begin_tick();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| scheduler.run_tick()));

        assert!(outcome.is_err());
        assert_eq!(
            handle.status(),
            TaskStatus::Failed(TaskError::Panicked("label exploded".to_string()))
        );
        assert_eq!(scheduler.live_tasks(), 0);
    }

    #[test]
    fn failing_task_does_not_stop_the_tick() {
        let scheduler = Scheduler::new();
        let hits = counter();
        let seen = Rc::clone(&hits);
        let failing = scheduler.spawn("failing", async { Err(TaskError::msg("blocked")) });
        scheduler.spawn("after", async move {
            seen.set(seen.get() + 1);
            Ok(())
        });

        scheduler.begin_tick();
        assert_eq!(scheduler.run_tick(), 2);

        assert!(failing.is_done());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn task_spawned_during_tick_is_polled_in_same_tick() {
        let scheduler = Rc::new(Scheduler::new());
        let hits = counter();
        let (inner, seen) = (Rc::clone(&scheduler), Rc::clone(&hits));
        scheduler.spawn("parent", async move {
            inner.spawn("child", async move {
                seen.set(seen.get() + 1);
                Ok(())
            });
            Ok(())
        });

        scheduler.begin_tick();
        assert_eq!(scheduler.run_tick(), 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn wait_ticks_counts_whole_ticks() {
        let scheduler = Rc::new(Scheduler::new());
        let inner = Rc::clone(&scheduler);
        let handle = scheduler.spawn("waiting", async move {
            inner.wait_ticks(3).await;
            Ok(())
        });

        for _ in 0..3 {
            scheduler.begin_tick();
            scheduler.run_tick();
            assert!(!handle.is_done());
        }
        scheduler.begin_tick();
        scheduler.run_tick();
        assert!(handle.is_done());
    }
}
