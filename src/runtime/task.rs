//! Task handles for cooperatively scheduled routines.

use crate::labels::LabelError;
use crate::machine::TransitionError;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use thiserror::Error;

/// Outcome of a label or latent routine.
pub type TaskResult = Result<(), TaskError>;

/// A resumable unit of work owned by the scheduler.
pub type LocalTask = Pin<Box<dyn Future<Output = TaskResult>>>;

/// Errors a routine may finish with.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    #[error("Task failed: {0}")]
    Failed(String),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Lifecycle of a scheduled task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskStatus {
    /// Spawned and not finished; it may have a pending cancellation.
    Running,
    /// The routine returned `Ok(())`.
    Completed,
    /// The routine returned an error or panicked.
    Failed(TaskError),
    /// The routine was dropped at a suspension point after `cancel()`.
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

struct TaskCell {
    id: u64,
    name: String,
    status: RefCell<TaskStatus>,
    cancel_requested: Cell<bool>,
}

/// Shared handle to a spawned task.
///
/// Cancellation is cooperative: `cancel()` only marks the task, and the
/// scheduler drops the routine at its next suspension point. Until then
/// `is_done()` stays false.
#[derive(Clone)]
pub struct TaskHandle {
    cell: Rc<TaskCell>,
}

impl TaskHandle {
    pub(crate) fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            cell: Rc::new(TaskCell {
                id,
                name: name.into(),
                status: RefCell::new(TaskStatus::Running),
                cancel_requested: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.cell.id
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn status(&self) -> TaskStatus {
        self.cell.status.borrow().clone()
    }

    pub fn is_done(&self) -> bool {
        self.cell.status.borrow().is_terminal()
    }

    /// Whether cancellation was requested, whether or not it was observed yet.
    pub fn is_cancelled(&self) -> bool {
        self.cell.cancel_requested.get()
    }

    /// Request cancellation. No-op on a finished task.
    pub fn cancel(&self) {
        if !self.is_done() {
            self.cell.cancel_requested.set(true);
        }
    }

    pub(crate) fn finish(&self, status: TaskStatus) {
        let mut current = self.cell.status.borrow_mut();
        if !current.is_terminal() {
            *current = status;
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("status", &*self.cell.status.borrow())
            .field("cancel_requested", &self.cell.cancel_requested.get())
            .finish()
    }
}
