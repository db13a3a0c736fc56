//! The orchestrator: state stack, global states and transitions.
//!
//! # Key Concepts
//!
//! - **Goto**: replaces the top of the stack, ending the old state
//! - **Push/Pop**: pauses the top and later resumes it, preserving its labels
//! - **Global states**: always active, never on the stack
//!
//! Transitions are synchronous and may not nest: requesting one from a
//! lifecycle hook of another is a contract violation and panics.

mod builder;
mod completion;
mod config;
mod core;
mod error;
#[allow(clippy::module_inception)]
mod machine;
mod snapshot;

pub use builder::StateMachineBuilder;
pub use completion::PushCompletion;
pub use config::MachineConfig;
pub use error::{BuildError, SnapshotError, TransitionError};
pub use machine::StateMachine;
pub use snapshot::{MachineSnapshot, StateSnapshot, SNAPSHOT_VERSION};

pub use self::core::MachineHandle;

pub(crate) use self::core::MachineCore;
