//! Orchestrator internals shared between the machine and its states.

use super::completion::{Frame, PushCompletion};
use super::config::MachineConfig;
use super::error::TransitionError;
use crate::core::{StateAction, StateHistory, StateId, StateTransition, TransitionKind};
use crate::labels::{LabelNamespace, LabelTag, DEFAULT_LABEL};
use crate::runtime::{Clock, NextTick, Scheduler, TimerQueue};
use crate::state::{MachineState, StateBehavior, StateKind};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use uuid::Uuid;

pub(crate) struct Registration {
    pub(crate) behavior: Rc<dyn StateBehavior>,
    pub(crate) kind: StateKind,
}

/// Clears the in-transition flag when the transition finishes.
///
/// A transition cut short by a panic keeps the flag set: its hooks ran only
/// partway, so every later transition request panics instead of building
/// on a half-applied stack.
struct TransitionGuard<'a> {
    active: &'a Cell<bool>,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.active.set(false);
        }
    }
}

pub(crate) struct MachineCore {
    id: Uuid,
    config: MachineConfig,
    namespace: Rc<dyn LabelNamespace>,
    clock: Rc<dyn Clock>,
    scheduler: Scheduler,
    timers: TimerQueue,
    registry: HashMap<StateId, Registration>,
    globals: Vec<StateId>,
    instances: RefCell<HashMap<StateId, Rc<MachineState>>>,
    stack: RefCell<Vec<Frame>>,
    in_transition: Cell<bool>,
    history: RefCell<StateHistory>,
    this: Weak<MachineCore>,
}

impl MachineCore {
    pub(crate) fn new(
        config: MachineConfig,
        namespace: Rc<dyn LabelNamespace>,
        clock: Rc<dyn Clock>,
        registry: HashMap<StateId, Registration>,
        globals: Vec<StateId>,
    ) -> Rc<Self> {
        let history = StateHistory::with_limit(config.history_limit);
        Rc::new_cyclic(|this| Self {
            id: Uuid::new_v4(),
            config,
            namespace,
            clock,
            scheduler: Scheduler::new(),
            timers: TimerQueue::new(),
            registry,
            globals,
            instances: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            in_transition: Cell::new(false),
            history: RefCell::new(history),
            this: this.clone(),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub(crate) fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    pub(crate) fn time(&self) -> f64 {
        self.clock.now()
    }

    pub(crate) fn next_tick(&self) -> NextTick {
        self.scheduler.next_tick()
    }

    pub(crate) fn wait_ticks(&self, ticks: u64) -> NextTick {
        self.scheduler.wait_ticks(ticks)
    }

    pub(crate) fn history(&self) -> StateHistory {
        self.history.borrow().clone()
    }

    pub(crate) fn globals(&self) -> &[StateId] {
        &self.globals
    }

    pub(crate) fn is_registered(&self, id: &StateId) -> bool {
        self.registry.contains_key(id)
    }

    pub(crate) fn kind_of(&self, id: &StateId) -> Option<StateKind> {
        self.registry.get(id).map(|registration| registration.kind)
    }

    // Instances

    /// Get the instance for `id`, creating and initializing it on first use.
    pub(crate) fn instance(&self, id: &StateId) -> Option<Rc<MachineState>> {
        if let Some(state) = self.instances.borrow().get(id) {
            return Some(Rc::clone(state));
        }

        let registration = self.registry.get(id)?;
        let state = MachineState::new(
            id.clone(),
            registration.kind,
            Rc::clone(&registration.behavior),
            MachineHandle::new(self.this.clone()),
            Rc::clone(&self.namespace),
        );
        state.initialize();
        tracing::debug!(state = %id, kind = ?registration.kind, "state instantiated");
        self.instances
            .borrow_mut()
            .insert(id.clone(), Rc::clone(&state));
        Some(state)
    }

    /// Instances created so far, sorted by descriptor.
    pub(crate) fn instances(&self) -> Vec<Rc<MachineState>> {
        let mut states: Vec<Rc<MachineState>> =
            self.instances.borrow().values().cloned().collect();
        states.sort_by(|a, b| a.id().cmp(b.id()));
        states
    }

    pub(crate) fn existing(&self, id: &StateId) -> Option<Rc<MachineState>> {
        self.instances.borrow().get(id).cloned()
    }

    fn top_instance(&self) -> Option<Rc<MachineState>> {
        let top = self.current_state()?;
        self.existing(&top)
    }

    fn global_instances(&self) -> Vec<Rc<MachineState>> {
        self.globals
            .iter()
            .filter_map(|id| self.existing(id))
            .collect()
    }

    // Queries

    pub(crate) fn current_state(&self) -> Option<StateId> {
        self.stack.borrow().last().map(|frame| frame.state.clone())
    }

    pub(crate) fn stack(&self) -> Vec<StateId> {
        self.stack
            .borrow()
            .iter()
            .map(|frame| frame.state.clone())
            .collect()
    }

    pub(crate) fn stack_depth(&self) -> usize {
        self.stack.borrow().len()
    }

    fn stack_contains(&self, id: &StateId) -> bool {
        self.stack.borrow().iter().any(|frame| &frame.state == id)
    }

    /// Top of the stack or one of the global states.
    pub(crate) fn is_in_state(&self, id: &StateId) -> bool {
        self.current_state().as_ref() == Some(id) || self.globals.contains(id)
    }

    // Transitions

    fn enter_transition(&self, kind: TransitionKind) -> TransitionGuard<'_> {
        if self.in_transition.replace(true) {
            panic!("{kind:?} transition requested while another transition is in progress");
        }
        TransitionGuard {
            active: &self.in_transition,
        }
    }

    /// Resolve a stack target: registered, not global, instantiated, and
    /// owning `label`.
    fn stack_target(
        &self,
        target: &StateId,
        label: &LabelTag,
    ) -> Result<Rc<MachineState>, TransitionError> {
        match self.kind_of(target) {
            None => {
                return Err(TransitionError::UnknownState {
                    state: target.clone(),
                })
            }
            Some(StateKind::Global) => {
                return Err(TransitionError::GlobalTarget {
                    state: target.clone(),
                })
            }
            Some(StateKind::Ordinary) => {}
        }
        if self.stack_contains(target) {
            return Err(TransitionError::AlreadyInStack {
                state: target.clone(),
            });
        }
        let state = self
            .instance(target)
            .ok_or_else(|| TransitionError::UnknownState {
                state: target.clone(),
            })?;
        state.check_label(label)?;
        Ok(state)
    }

    fn record(&self, kind: TransitionKind, from: Option<StateId>, to: StateId, label: Option<LabelTag>) {
        self.history.borrow_mut().record(StateTransition {
            kind,
            from,
            to,
            label,
            timestamp: Utc::now(),
        });
    }

    /// Replace the top of the stack with `target`, or switch label when
    /// `target` already is the top.
    pub(crate) fn goto_state(&self, target: StateId, label: LabelTag) -> Result<(), TransitionError> {
        let _guard = self.enter_transition(TransitionKind::Goto);
        let previous = self.current_state();

        if previous.as_ref() == Some(&target) {
            let state = self
                .existing(&target)
                .ok_or_else(|| TransitionError::UnknownState {
                    state: target.clone(),
                })?;
            state.goto_label(label)?;
            return Ok(());
        }

        let next = self.stack_target(&target, &label)?;
        tracing::debug!(from = ?previous, to = %target, label = %label, "goto state");

        if let Some(current) = previous.as_ref().and_then(|id| self.existing(id)) {
            current.on_state_action(StateAction::End, Some(&target));
        }
        {
            let mut stack = self.stack.borrow_mut();
            match stack.last_mut() {
                Some(frame) => frame.state = target.clone(),
                None => stack.push(Frame::new(target.clone())),
            }
        }
        next.on_state_action(StateAction::Begin, previous.as_ref());
        next.set_initial_label(label.clone());

        self.record(TransitionKind::Goto, previous, target, Some(label));
        Ok(())
    }

    /// Pause the top of the stack and push `target` above it.
    pub(crate) fn push_state(
        &self,
        target: StateId,
        label: LabelTag,
    ) -> Result<PushCompletion, TransitionError> {
        let _guard = self.enter_transition(TransitionKind::Push);
        let next = self.stack_target(&target, &label)?;
        let previous = self.current_state();
        tracing::debug!(from = ?previous, to = %target, label = %label, "push state");

        if let Some(current) = previous.as_ref().and_then(|id| self.existing(id)) {
            current.on_state_action(StateAction::Pause, None);
        }
        let (frame, completion) = Frame::pushed(target.clone());
        self.stack.borrow_mut().push(frame);
        next.on_state_action(StateAction::Begin, previous.as_ref());
        next.on_state_action(StateAction::Push, None);
        next.set_initial_label(label.clone());

        self.record(TransitionKind::Push, previous, target, Some(label));
        Ok(completion)
    }

    /// Pop the top of the stack and resume the state beneath it.
    pub(crate) fn pop_state(&self) -> Result<(), TransitionError> {
        let _guard = self.enter_transition(TransitionKind::Pop);
        let stack = self.stack();
        let (popped, resumed) = match stack.as_slice() {
            [] => return Err(TransitionError::Empty),
            [only] => {
                return Err(TransitionError::CannotPopLast {
                    state: only.clone(),
                })
            }
            [.., below, top] => (top.clone(), below.clone()),
        };
        tracing::debug!(from = %popped, to = %resumed, "pop state");

        if let Some(state) = self.existing(&popped) {
            state.on_state_action(StateAction::Pop, None);
        }
        let frame = self.stack.borrow_mut().pop();
        if let Some(state) = self.existing(&resumed) {
            state.on_state_action(StateAction::Resume, None);
        }
        if let Some(frame) = frame {
            frame.release();
        }

        self.record(TransitionKind::Pop, Some(popped), resumed, None);
        Ok(())
    }

    /// Instantiate every global state and run its `Begin`.
    pub(crate) fn start_globals(&self) {
        let _guard = self.enter_transition(TransitionKind::Goto);
        for id in &self.globals {
            if let Some(state) = self.instance(id) {
                state.on_state_action(StateAction::Begin, None);
                state.set_initial_label(DEFAULT_LABEL);
            }
        }
    }

    // Tick

    pub(crate) fn tick(&self, delta: f64) {
        let tick = self.scheduler.begin_tick();
        self.clock.advance(delta);
        self.timers.fire_due(self.clock.now());

        for state in self.global_instances() {
            state.tick(delta);
        }
        if let Some(state) = self.top_instance() {
            state.tick(delta);
        }
        self.scheduler.run_tick();

        if self.config.sweeps_on(tick) {
            let removed: usize = self
                .instances()
                .iter()
                .map(|state| state.clear_invalid_latent_cancellers())
                .sum();
            tracing::trace!(tick, count = removed, "latent sweep");
        }
    }

    /// Stop the local latent work of every stacked and global state.
    pub(crate) fn stop_every_latent_execution(&self) -> usize {
        let mut states: Vec<Rc<MachineState>> = self
            .stack()
            .iter()
            .filter_map(|id| self.existing(id))
            .collect();
        states.extend(self.global_instances());
        let stopped = states
            .iter()
            .map(|state| state.stop_local_latent_execution())
            .sum();
        tracing::debug!(count = stopped, "every latent execution stopped");
        stopped
    }

    /// Stop labels and latent work of every instance.
    pub(crate) fn teardown(&self) {
        for state in self.instances() {
            state.stop_running_labels();
            state.stop_local_latent_execution();
        }
    }
}

/// Shared, non-owning reference from a state back to its machine.
///
/// Every state receives one at construction. Using it after the machine
/// was dropped is a contract violation.
#[derive(Clone)]
pub struct MachineHandle {
    core: Weak<MachineCore>,
}

impl MachineHandle {
    pub(crate) fn new(core: Weak<MachineCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> Rc<MachineCore> {
        match self.core.upgrade() {
            Some(core) => core,
            None => panic!("state machine used after it was dropped"),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.core().current_state()
    }

    pub fn is_in_state(&self, id: &StateId) -> bool {
        self.core().is_in_state(id)
    }

    pub fn goto_state(&self, target: StateId, label: LabelTag) -> Result<(), TransitionError> {
        self.core().goto_state(target, label)
    }

    pub fn push_state(&self, target: StateId, label: LabelTag) -> PushCompletion {
        match self.core().push_state(target, label) {
            Ok(completion) => completion,
            Err(error) => PushCompletion::failed(error),
        }
    }

    pub fn pop_state(&self) -> Result<(), TransitionError> {
        self.core().pop_state()
    }

    pub fn stop_every_latent_execution(&self) -> usize {
        self.core().stop_every_latent_execution()
    }

    pub fn time(&self) -> f64 {
        self.core().time()
    }
}

impl std::fmt::Debug for MachineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
