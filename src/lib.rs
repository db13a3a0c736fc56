//! Stackmind: a stack-based hierarchical state machine
//!
//! States live on a stack. The top of the stack is the active state, the
//! states beneath it are paused, and a set of global states runs beside the
//! stack at all times. Every state executes *labels*: named, tick-driven
//! routines that may suspend across ticks and are cancelled cooperatively
//! when their state ends.
//!
//! # Core Concepts
//!
//! - **States**: `StateBehavior` implementations registered under a `StateId`
//! - **Labels**: hierarchical `LabelTag`s bound to async routines
//! - **Transitions**: goto, push and pop, each notifying lifecycle hooks
//! - **Latent work**: timers and secondary routines a state can cancel in bulk
//!
//! # Example
//!
//! ```rust
//! use stackmind::core::StateId;
//! use stackmind::labels::{LabelCallback, DEFAULT_LABEL};
//! use stackmind::machine::StateMachineBuilder;
//! use stackmind::state::StateSpec;
//!
//! stackmind::label_tags! {
//!     const SEARCH = "Search";
//! }
//!
//! const IDLE: StateId = StateId::from_static("Idle");
//! const ALERT: StateId = StateId::from_static("Alert");
//!
//! let machine = StateMachineBuilder::new()
//!     .state(
//!         IDLE,
//!         StateSpec::new().label(
//!             SEARCH,
//!             LabelCallback::new(|cx| async move {
//!                 cx.goto_state(ALERT, DEFAULT_LABEL)?;
//!                 Ok(())
//!             }),
//!         ),
//!     )
//!     .state(ALERT, StateSpec::new())
//!     .initial_with_label(IDLE, SEARCH)
//!     .build()
//!     .unwrap();
//!
//! // The label starts on the first tick and runs its body on the second.
//! machine.tick(0.1);
//! machine.tick(0.1);
//! assert_eq!(machine.current_state(), Some(ALERT));
//! ```

pub mod core;
pub mod labels;
pub mod machine;
pub mod runtime;
pub mod state;

// Re-export commonly used types
pub use self::core::{StateAction, StateActionEvent, StateId};
pub use labels::{LabelCallback, LabelError, LabelTag, DEFAULT_LABEL};
pub use machine::{
    BuildError, MachineConfig, MachineHandle, PushCompletion, StateMachine, StateMachineBuilder,
    TransitionError,
};
pub use runtime::{TaskError, TaskResult};
pub use state::{LabelContext, MachineState, StateBehavior, StateSpec};
