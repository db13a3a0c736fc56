//! Cooperative runtime driving labels and latent work.
//!
//! The runtime is single-threaded and advanced by the state machine's tick:
//! - `Scheduler` polls every live task at most once per tick
//! - `TaskHandle` exposes cooperative cancellation and completion
//! - `TimerQueue` fires delayed callbacks against a `Clock`
//!
//! Suspension only happens at `.await` points, so a routine runs
//! synchronously between them and cancellation is observed there.

mod clock;
mod scheduler;
mod task;
mod timer;

pub use clock::{Clock, TickClock};
pub use scheduler::{NextTick, Scheduler};
pub use task::{LocalTask, TaskError, TaskHandle, TaskResult, TaskStatus};
pub use timer::{Delay, TimerHandle, TimerQueue, TimerStatus};
