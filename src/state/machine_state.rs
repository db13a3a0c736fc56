//! The per-state behavior unit.
//!
//! A `MachineState` is created once per state descriptor, the first time
//! the state becomes reachable, and lives until its owning machine is
//! dropped. Activations replay lifecycle hooks on the same instance.

use super::behavior::{StateBehavior, StateKind};
use super::context::LabelContext;
use super::events::{StateActionChannel, Subscription};
use super::latent::{LatentCanceller, LatentTaskTracker};
use crate::core::{StateAction, StateActionEvent, StateId};
use crate::labels::validation::{
    first_violation, in_namespace, validate_registration, validate_switch,
};
use crate::labels::{
    LabelCallback, LabelError, LabelNamespace, LabelTable, LabelTag, DEFAULT_LABEL,
};
use crate::machine::{MachineCore, MachineHandle, PushCompletion, TransitionError};
use crate::runtime::{Delay, TaskError, TaskHandle, TaskResult, TimerHandle};
use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

pub struct MachineState {
    id: StateId,
    kind: StateKind,
    behavior: Rc<dyn StateBehavior>,
    machine: MachineHandle,
    namespace: Rc<dyn LabelNamespace>,
    this: Weak<MachineState>,
    labels: RefCell<LabelTable>,
    active_label: RefCell<LabelTag>,
    label_activated: Cell<bool>,
    data: RefCell<Option<Box<dyn Any>>>,
    tracker: LatentTaskTracker,
    events: StateActionChannel,
}

impl MachineState {
    /// Build a state bound to its machine and register its labels.
    ///
    /// The machine reference is fixed here and never changes.
    pub(crate) fn new(
        id: StateId,
        kind: StateKind,
        behavior: Rc<dyn StateBehavior>,
        machine: MachineHandle,
        namespace: Rc<dyn LabelNamespace>,
    ) -> Rc<Self> {
        let state = Rc::new_cyclic(|this| Self {
            id,
            kind,
            behavior,
            machine,
            namespace,
            this: this.clone(),
            labels: RefCell::new(LabelTable::new()),
            active_label: RefCell::new(DEFAULT_LABEL),
            label_activated: Cell::new(false),
            data: RefCell::new(None),
            tracker: LatentTaskTracker::new(),
            events: StateActionChannel::new(),
        });

        // The table is empty and the default tag passes every namespace.
        let _ = state.register_label(DEFAULT_LABEL, LabelCallback::new(|_cx| async { Ok(()) }));
        let behavior = Rc::clone(&state.behavior);
        behavior.register_labels(&state);
        state
    }

    /// Allocate the state's data payload. Called exactly once by the
    /// machine, right after construction.
    pub fn initialize(&self) {
        assert!(
            self.data.borrow().is_none(),
            "state [{}] initialized twice",
            self.id
        );
        let Some(factory) = self.behavior.data_factory() else {
            panic!("state [{}] declares no data payload type", self.id);
        };
        *self.data.borrow_mut() = Some(factory.create());
        tracing::debug!(state = %self.id, data = factory.type_name(), "state data created");
    }

    pub fn id(&self) -> &StateId {
        &self.id
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn is_global(&self) -> bool {
        self.kind == StateKind::Global
    }

    pub(crate) fn machine(&self) -> Rc<MachineCore> {
        self.machine.core()
    }

    /// Handle to the owning machine.
    pub fn machine_handle(&self) -> &MachineHandle {
        &self.machine
    }

    fn rc(&self) -> Rc<MachineState> {
        match self.this.upgrade() {
            Some(state) => state,
            None => panic!("state [{}] used while being dropped", self.id),
        }
    }

    // Labels

    /// Register `callback` under `label`.
    ///
    /// The stored routine always yields to the next tick before running the
    /// callback, so a freshly armed label never does work in the tick it
    /// was started in.
    pub fn register_label(&self, label: LabelTag, callback: LabelCallback) -> Result<(), LabelError> {
        let validation = validate_registration(
            self.namespace.as_ref(),
            &self.labels.borrow(),
            &self.id,
            &label,
            &callback,
        );
        first_violation(&self.id, validation)?;

        let wrapped = LabelCallback::new(move |cx: LabelContext| {
            let callback = callback.clone();
            async move {
                cx.next_tick().await;
                match callback.invoke(cx) {
                    Some(routine) => routine.await,
                    None => Err(TaskError::msg("label callback became unbound")),
                }
            }
        });

        tracing::trace!(state = %self.id, label = %label, "label registered");
        self.labels.borrow_mut().insert(label, wrapped);
        Ok(())
    }

    pub fn contains_label(&self, label: &LabelTag) -> bool {
        self.labels.borrow().contains(label)
    }

    /// Registered label tags, sorted.
    pub fn labels(&self) -> Vec<LabelTag> {
        self.labels.borrow().tags().into_iter().cloned().collect()
    }

    /// Whether `label` is a valid label tag under this machine's namespace.
    pub fn is_label_tag_correct(&self, label: &LabelTag) -> bool {
        in_namespace(self.namespace.as_ref(), label)
    }

    pub fn active_label(&self) -> LabelTag {
        self.active_label.borrow().clone()
    }

    /// Whether the active label's routine has been started since the label
    /// was set.
    pub fn is_label_activated(&self) -> bool {
        self.label_activated.get()
    }

    /// Arm `label` without validation.
    pub fn set_initial_label(&self, label: LabelTag) {
        *self.active_label.borrow_mut() = label;
        self.label_activated.set(false);
    }

    /// Switch to `label`; its routine starts on the next tick. Routines of
    /// the previous label keep running until `stop_running_labels`.
    pub fn goto_label(&self, label: LabelTag) -> Result<(), LabelError> {
        self.check_label(&label)?;
        tracing::debug!(state = %self.id, label = %label, "goto label");
        self.set_initial_label(label);
        Ok(())
    }

    pub(crate) fn check_label(&self, label: &LabelTag) -> Result<(), LabelError> {
        let validation = validate_switch(
            self.namespace.as_ref(),
            &self.labels.borrow(),
            &self.id,
            label,
        );
        first_violation(&self.id, validation)
    }

    /// Start the active label's routine if it has not been started yet.
    pub fn tick(&self, _delta: f64) {
        if self.label_activated.get() {
            return;
        }

        let label = self.active_label();
        let callback = self.labels.borrow().get(&label).cloned();
        let Some(callback) = callback else {
            panic!("active label [{label}] is not registered in state [{}]", self.id);
        };
        let Some(routine) = callback.invoke(LabelContext::new(self.rc())) else {
            panic!("active label [{label}] of state [{}] is unbound", self.id);
        };

        self.label_activated.set(true);
        let handle = self
            .machine()
            .scheduler()
            .spawn_boxed(format!("{}::{}", self.id, label.leaf()), routine);
        tracing::trace!(state = %self.id, label = %label, task = handle.id(), "label started");
        self.tracker.track_label(handle);
    }

    /// Cancel every tracked label routine. Returns how many had not
    /// finished.
    pub fn stop_running_labels(&self) -> usize {
        let stopped = self.tracker.stop_labels();
        tracing::trace!(state = %self.id, count = stopped, "running labels cancelled");
        stopped
    }

    /// Label routines of this state that have not finished yet.
    pub fn running_label_count(&self) -> usize {
        self.tracker.running_labels()
    }

    pub fn running_label_handles(&self) -> Vec<TaskHandle> {
        self.tracker.label_handles()
    }

    // Latent execution

    /// Stop latent work machine-wide, through the machine.
    pub fn stop_latent_execution(&self) -> usize {
        self.machine().stop_every_latent_execution()
    }

    /// Invoke every latent canceller recorded by this state.
    pub fn stop_local_latent_execution(&self) -> usize {
        let stopped = self.tracker.stop_latent();
        tracing::trace!(state = %self.id, count = stopped, "latent executions cancelled");
        stopped
    }

    /// Forget cancellers whose work already finished.
    pub fn clear_invalid_latent_cancellers(&self) -> usize {
        let removed = self.tracker.clear_invalid();
        tracing::trace!(state = %self.id, count = removed, "stale latent cancellers removed");
        removed
    }

    pub fn latent_record_count(&self) -> usize {
        self.tracker.latent_records()
    }

    pub fn add_latent_canceller(&self, canceller: LatentCanceller) {
        self.tracker.add_canceller(canceller);
    }

    /// Run `callback` once `delay` seconds of machine time have passed,
    /// unless this state's latent work is stopped first.
    pub fn run_after(
        &self,
        delay: f64,
        callback: impl FnOnce(&MachineState) + 'static,
    ) -> TimerHandle {
        let this = self.this.clone();
        let machine = self.machine();
        let timer = machine.timers().schedule_after(machine.time(), delay, move || {
            if let Some(state) = this.upgrade() {
                callback(&state);
            }
        });
        self.tracker.add_canceller(LatentCanceller::for_timer(timer.clone()));
        timer
    }

    /// Start a secondary routine that is not a label, cancelled with this
    /// state's latent work.
    pub fn spawn_latent<F>(&self, name: impl Into<String>, future: F) -> TaskHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let handle = self.machine().scheduler().spawn(name, future);
        self.tracker.add_canceller(LatentCanceller::for_task(handle.clone()));
        handle
    }

    pub fn time(&self) -> f64 {
        self.machine().time()
    }

    pub fn time_since(&self, time: f64) -> f64 {
        self.time() - time
    }

    pub fn delay(&self, seconds: f64) -> Delay {
        Delay::new(self.machine().clock(), seconds)
    }

    // Data

    pub fn data<T: 'static>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.data.borrow(), |data| {
            data.as_ref().and_then(|data| data.downcast_ref::<T>())
        })
        .ok()
    }

    pub fn data_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.data.borrow_mut(), |data| {
            data.as_mut().and_then(|data| data.downcast_mut::<T>())
        })
        .ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.data.borrow().is_some()
    }

    // Transitions

    /// Whether this state is the top of the stack.
    pub fn is_state_active(&self) -> bool {
        self.machine().current_state().as_ref() == Some(&self.id)
    }

    pub fn goto_state(&self, target: StateId, label: LabelTag) -> Result<(), TransitionError> {
        self.machine().goto_state(target, label)
    }

    /// Push `target`; the returned future resolves once it is popped.
    pub fn push_state(&self, target: StateId, label: LabelTag) -> PushCompletion {
        match self.machine().push_state(target, label) {
            Ok(completion) => completion,
            Err(error) => PushCompletion::failed(error),
        }
    }

    pub fn pop_state(&self) -> Result<(), TransitionError> {
        self.machine().pop_state()
    }

    // Lifecycle

    pub fn subscribe(&self, listener: impl Fn(&StateActionEvent) + 'static) -> Subscription {
        self.events.subscribe(listener)
    }

    /// Route `action` to its hook, then broadcast it.
    ///
    /// # Panics
    ///
    /// Panics when a stack-only action reaches a global state.
    pub fn on_state_action(&self, action: StateAction, related: Option<&StateId>) {
        assert!(
            !(self.is_global() && action.is_stack_only()),
            "{action} is not allowed on global state [{}]",
            self.id
        );
        match action {
            StateAction::Begin => self.begin(related),
            StateAction::End => self.end(related),
            StateAction::Push => self.pushed(),
            StateAction::Pop => self.popped(),
            StateAction::Pause => self.paused(),
            StateAction::Resume => self.resumed(),
        }

        self.events.broadcast(&StateActionEvent {
            state: self.id.clone(),
            action,
            related: related.cloned(),
        });
    }

    fn teardown(&self) {
        self.stop_running_labels();
        self.stop_local_latent_execution();
        self.set_initial_label(DEFAULT_LABEL);
    }

    fn begin(&self, previous: Option<&StateId>) {
        tracing::debug!(state = %self.id, previous = ?previous, "begin");
        self.behavior.begin(self, previous);
    }

    fn end(&self, next: Option<&StateId>) {
        tracing::debug!(state = %self.id, next = ?next, "end");
        self.behavior.end(self, next);
        self.teardown();
    }

    fn pushed(&self) {
        tracing::debug!(state = %self.id, "pushed");
        self.behavior.pushed(self);
    }

    fn popped(&self) {
        tracing::debug!(state = %self.id, "popped");
        self.behavior.popped(self);
        self.teardown();
    }

    fn paused(&self) {
        tracing::debug!(state = %self.id, "paused");
        self.behavior.paused(self);
    }

    fn resumed(&self) {
        tracing::debug!(state = %self.id, "resumed");
        self.behavior.resumed(self);
    }
}

impl Drop for MachineState {
    fn drop(&mut self) {
        self.tracker.stop_labels();
        self.tracker.stop_latent();
    }
}

impl fmt::Debug for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineState")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active_label", &*self.active_label.borrow())
            .field("label_activated", &self.label_activated.get())
            .field("labels", &self.labels.borrow().len())
            .field("tracker", &self.tracker)
            .finish()
    }
}
