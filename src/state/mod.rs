//! Machine states: labels, latent work, payloads and lifecycle hooks.
//!
//! A `MachineState` wraps a user `StateBehavior`. It owns:
//! - a label table and the active label, started lazily on tick
//! - a `LatentTaskTracker` for running label tasks and latent cancellers
//! - a data payload allocated once at initialization
//! - a `StateActionChannel` broadcasting every lifecycle action
//!
//! States are never constructed directly; the `StateMachine` creates them
//! the first time they become reachable.

mod behavior;
mod context;
mod data;
mod events;
mod latent;
mod machine_state;

pub use behavior::{StateBehavior, StateKind, StateSpec};
pub use context::LabelContext;
pub use data::{DataFactory, DefaultStateData};
pub use events::{StateActionChannel, Subscription};
pub use latent::{LatentCanceller, LatentTaskTracker};
pub use machine_state::MachineState;
