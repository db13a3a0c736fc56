//! Core value types of the state machine.
//!
//! This module contains the plain data shared by states and the
//! orchestrator:
//! - State descriptors via `StateId`
//! - The closed set of lifecycle actions and the events they produce
//! - Bounded transition history
//!
//! Nothing in this module schedules work or owns a state.

mod action;
mod history;
mod state;

pub use action::{StateAction, StateActionEvent};
pub use history::{StateHistory, StateTransition, TransitionKind};
pub use state::StateId;
