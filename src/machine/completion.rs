//! Stack frames and the future returned to a pushing caller.

use super::error::TransitionError;
use crate::core::StateId;
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// One entry of the state stack.
///
/// A goto replaces `state` but keeps the waiters, so a pushing caller
/// resumes when the frame it pushed is popped, whatever state it holds.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) state: StateId,
    waiters: Vec<Rc<Cell<bool>>>,
}

impl Frame {
    pub(crate) fn new(state: StateId) -> Self {
        Self {
            state,
            waiters: Vec::new(),
        }
    }

    pub(crate) fn pushed(state: StateId) -> (Self, PushCompletion) {
        let popped = Rc::new(Cell::new(false));
        let frame = Self {
            state,
            waiters: vec![Rc::clone(&popped)],
        };
        (frame, PushCompletion::waiting(popped))
    }

    pub(crate) fn release(self) {
        for waiter in self.waiters {
            waiter.set(true);
        }
    }
}

enum Outcome {
    Waiting(Rc<Cell<bool>>),
    Failed(Option<TransitionError>),
}

/// Resolves when a pushed state is popped, or immediately with the error
/// that prevented the push.
///
/// The push itself has already happened when this value is returned;
/// awaiting it only suspends the caller.
pub struct PushCompletion {
    outcome: Outcome,
}

impl PushCompletion {
    fn waiting(popped: Rc<Cell<bool>>) -> Self {
        Self {
            outcome: Outcome::Waiting(popped),
        }
    }

    pub(crate) fn failed(error: TransitionError) -> Self {
        Self {
            outcome: Outcome::Failed(Some(error)),
        }
    }

    /// Whether awaiting would complete immediately.
    pub fn is_resolved(&self) -> bool {
        match &self.outcome {
            Outcome::Waiting(popped) => popped.get(),
            Outcome::Failed(_) => true,
        }
    }
}

impl Future for PushCompletion {
    type Output = Result<(), TransitionError>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.outcome {
            Outcome::Waiting(popped) if popped.get() => Poll::Ready(Ok(())),
            Outcome::Waiting(_) => Poll::Pending,
            Outcome::Failed(error) => Poll::Ready(error.take().map_or(Ok(()), Err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_resolves_when_frame_is_released() {
        let (frame, completion) = Frame::pushed(StateId::from_static("Menu"));
        assert!(!completion.is_resolved());
        frame.release();
        assert!(completion.is_resolved());
    }

    #[test]
    fn failed_completion_is_resolved() {
        let completion = PushCompletion::failed(TransitionError::Empty);
        assert!(completion.is_resolved());
    }
}
