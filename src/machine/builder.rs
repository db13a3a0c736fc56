//! Builder for constructing state machines.

use super::config::MachineConfig;
use super::core::{MachineCore, Registration};
use super::error::BuildError;
use super::machine::StateMachine;
use crate::core::StateId;
use crate::labels::{LabelNamespace, LabelTag, TagNamespace, DEFAULT_LABEL};
use crate::runtime::{Clock, TickClock};
use crate::state::{StateBehavior, StateKind};
use std::collections::HashMap;
use std::rc::Rc;

/// Fluent builder registering the states a machine may reach.
///
/// Building starts every global state, then enters the initial state if
/// one was given; otherwise the stack starts empty.
///
/// ```rust
/// use stackmind::core::StateId;
/// use stackmind::machine::StateMachineBuilder;
/// use stackmind::state::StateSpec;
///
/// const IDLE: StateId = StateId::from_static("Idle");
///
/// let machine = StateMachineBuilder::new()
///     .state(IDLE, StateSpec::new())
///     .initial(IDLE)
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.current_state(), Some(IDLE));
/// ```
pub struct StateMachineBuilder {
    states: Vec<(StateId, Registration)>,
    initial: Option<(StateId, LabelTag)>,
    config: MachineConfig,
    namespace: Rc<dyn LabelNamespace>,
    clock: Rc<dyn Clock>,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            initial: None,
            config: MachineConfig::default(),
            namespace: Rc::new(TagNamespace::default()),
            clock: Rc::new(TickClock::new()),
        }
    }

    /// Register a state that lives on the stack.
    pub fn state(mut self, id: StateId, behavior: impl StateBehavior) -> Self {
        self.states.push((
            id,
            Registration {
                behavior: Rc::new(behavior),
                kind: StateKind::Ordinary,
            },
        ));
        self
    }

    /// Register a state running permanently beside the stack.
    pub fn global(mut self, id: StateId, behavior: impl StateBehavior) -> Self {
        self.states.push((
            id,
            Registration {
                behavior: Rc::new(behavior),
                kind: StateKind::Global,
            },
        ));
        self
    }

    /// Enter `id` on its default label once built.
    pub fn initial(self, id: StateId) -> Self {
        self.initial_with_label(id, DEFAULT_LABEL)
    }

    pub fn initial_with_label(mut self, id: StateId, label: LabelTag) -> Self {
        self.initial = Some((id, label));
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn label_namespace(mut self, namespace: impl LabelNamespace + 'static) -> Self {
        self.namespace = Rc::new(namespace);
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<StateMachine, BuildError> {
        let mut registry = HashMap::new();
        let mut globals = Vec::new();
        for (id, registration) in self.states {
            if registry.contains_key(&id) {
                return Err(BuildError::DuplicateState { state: id });
            }
            if registration.kind == StateKind::Global {
                globals.push(id.clone());
            }
            registry.insert(id, registration);
        }

        if let Some((id, _)) = &self.initial {
            match registry.get(id).map(|registration| registration.kind) {
                None => return Err(BuildError::UnknownInitialState { state: id.clone() }),
                Some(StateKind::Global) => {
                    return Err(BuildError::GlobalInitialState { state: id.clone() })
                }
                Some(StateKind::Ordinary) => {}
            }
        }

        let core = MachineCore::new(self.config, self.namespace, self.clock, registry, globals);
        core.start_globals();
        let machine = StateMachine::from_core(core);

        if let Some((id, label)) = self.initial {
            machine.goto_state(id, label)?;
        }
        tracing::debug!(machine = %machine.id(), stack = ?machine.stack(), "state machine built");
        Ok(machine)
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
