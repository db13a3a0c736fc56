//! User-defined state behavior.

use super::data::{DataFactory, DefaultStateData};
use super::machine_state::MachineState;
use crate::core::StateId;
use crate::labels::{LabelCallback, LabelTag};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Whether a state lives on the stack or runs permanently beside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Subject to goto, push, pop, pause and resume.
    Ordinary,
    /// Always active, never on the stack; only begin and end apply.
    Global,
}

/// Behavior plugged into a `MachineState`.
///
/// Every method has a default, so a unit struct implementing this trait is
/// a valid state that only runs the built-in default label. The hooks run
/// before the state's own bookkeeping (for `end` and `popped`, before its
/// labels and latent work are torn down).
pub trait StateBehavior: 'static {
    /// Payload type allocated once per state instance. Returning `None`
    /// makes initialization fail.
    fn data_factory(&self) -> Option<DataFactory> {
        Some(DataFactory::of::<DefaultStateData>())
    }

    /// Register labels. Called once, while the state is constructed.
    fn register_labels(&self, _state: &MachineState) {}

    fn begin(&self, _state: &MachineState, _previous: Option<&StateId>) {}

    fn end(&self, _state: &MachineState, _next: Option<&StateId>) {}

    fn pushed(&self, _state: &MachineState) {}

    fn popped(&self, _state: &MachineState) {}

    fn paused(&self, _state: &MachineState) {}

    fn resumed(&self, _state: &MachineState) {}
}

type TransitionHook = Rc<dyn Fn(&MachineState, Option<&StateId>)>;
type PlainHook = Rc<dyn Fn(&MachineState)>;

/// Closure-based `StateBehavior`, assembled fluently.
///
/// ```rust
/// use stackmind::labels::{LabelCallback, LabelTag};
/// use stackmind::state::StateSpec;
///
/// let spec = StateSpec::new()
///     .label(
///         LabelTag::new("StateMachine.Label.Wait"),
///         LabelCallback::new(|cx| async move {
///             cx.wait_ticks(10).await;
///             Ok(())
///         }),
///     )
///     .on_resumed(|state| {
///         let _ = state.goto_label(LabelTag::new("StateMachine.Label.Wait"));
///     });
/// assert_eq!(spec.label_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct StateSpec {
    data: Option<DataFactory>,
    missing_data: bool,
    labels: Vec<(LabelTag, LabelCallback)>,
    on_begin: Option<TransitionHook>,
    on_end: Option<TransitionHook>,
    on_pushed: Option<PlainHook>,
    on_popped: Option<PlainHook>,
    on_paused: Option<PlainHook>,
    on_resumed: Option<PlainHook>,
}

impl StateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the payload type.
    pub fn data<T: Default + 'static>(mut self) -> Self {
        self.data = Some(DataFactory::of::<T>());
        self.missing_data = false;
        self
    }

    /// Declare no payload type at all. Initializing such a state fails.
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self.missing_data = true;
        self
    }

    /// Queue a label for registration. Rejected labels are logged when the
    /// state is constructed.
    pub fn label(mut self, tag: LabelTag, callback: LabelCallback) -> Self {
        self.labels.push((tag, callback));
        self
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn on_begin(mut self, hook: impl Fn(&MachineState, Option<&StateId>) + 'static) -> Self {
        self.on_begin = Some(Rc::new(hook));
        self
    }

    pub fn on_end(mut self, hook: impl Fn(&MachineState, Option<&StateId>) + 'static) -> Self {
        self.on_end = Some(Rc::new(hook));
        self
    }

    pub fn on_pushed(mut self, hook: impl Fn(&MachineState) + 'static) -> Self {
        self.on_pushed = Some(Rc::new(hook));
        self
    }

    pub fn on_popped(mut self, hook: impl Fn(&MachineState) + 'static) -> Self {
        self.on_popped = Some(Rc::new(hook));
        self
    }

    pub fn on_paused(mut self, hook: impl Fn(&MachineState) + 'static) -> Self {
        self.on_paused = Some(Rc::new(hook));
        self
    }

    pub fn on_resumed(mut self, hook: impl Fn(&MachineState) + 'static) -> Self {
        self.on_resumed = Some(Rc::new(hook));
        self
    }
}

impl StateBehavior for StateSpec {
    fn data_factory(&self) -> Option<DataFactory> {
        match (self.data, self.missing_data) {
            (Some(factory), _) => Some(factory),
            (None, true) => None,
            (None, false) => Some(DataFactory::of::<DefaultStateData>()),
        }
    }

    fn register_labels(&self, state: &MachineState) {
        for (tag, callback) in &self.labels {
            let _ = state.register_label(tag.clone(), callback.clone());
        }
    }

    fn begin(&self, state: &MachineState, previous: Option<&StateId>) {
        if let Some(hook) = &self.on_begin {
            hook(state, previous);
        }
    }

    fn end(&self, state: &MachineState, next: Option<&StateId>) {
        if let Some(hook) = &self.on_end {
            hook(state, next);
        }
    }

    fn pushed(&self, state: &MachineState) {
        if let Some(hook) = &self.on_pushed {
            hook(state);
        }
    }

    fn popped(&self, state: &MachineState) {
        if let Some(hook) = &self.on_popped {
            hook(state);
        }
    }

    fn paused(&self, state: &MachineState) {
        if let Some(hook) = &self.on_paused {
            hook(state);
        }
    }

    fn resumed(&self, state: &MachineState) {
        if let Some(hook) = &self.on_resumed {
            hook(state);
        }
    }
}
