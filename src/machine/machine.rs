//! The orchestrator owning the state stack and the global states.

use super::completion::PushCompletion;
use super::config::MachineConfig;
use super::core::{MachineCore, MachineHandle};
use super::error::TransitionError;
use super::snapshot::{MachineSnapshot, StateSnapshot, SNAPSHOT_VERSION};
use crate::core::{StateHistory, StateId};
use crate::labels::LabelTag;
use crate::state::MachineState;
use chrono::Utc;
use std::rc::Rc;
use uuid::Uuid;

/// Stack-based state machine driven by `tick`.
///
/// Only the top of the stack is ticked; states beneath it are paused.
/// Global states are ticked every time, before the top of the stack.
/// Transitions run to completion synchronously: every hook and every
/// state-action broadcast of a transition happens before the call returns.
///
/// Dropping the machine cancels every running label and every latent
/// execution of every state.
pub struct StateMachine {
    core: Rc<MachineCore>,
}

impl StateMachine {
    pub(crate) fn from_core(core: Rc<MachineCore>) -> Self {
        Self { core }
    }

    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    pub fn config(&self) -> &MachineConfig {
        self.core.config()
    }

    /// Non-owning handle, as held by every state.
    pub fn handle(&self) -> MachineHandle {
        MachineHandle::new(Rc::downgrade(&self.core))
    }

    /// Advance the machine by one tick of `delta` seconds: fire due timers,
    /// start pending labels of the global states and the top of the stack,
    /// then resume every suspended routine once.
    pub fn tick(&self, delta: f64) {
        self.core.tick(delta);
    }

    pub fn goto_state(&self, target: StateId, label: LabelTag) -> Result<(), TransitionError> {
        self.core.goto_state(target, label)
    }

    /// Push `target` above the current top. The returned completion
    /// resolves once the pushed frame is popped.
    pub fn push_state(
        &self,
        target: StateId,
        label: LabelTag,
    ) -> Result<PushCompletion, TransitionError> {
        self.core.push_state(target, label)
    }

    pub fn pop_state(&self) -> Result<(), TransitionError> {
        self.core.pop_state()
    }

    /// Top of the stack, if any state was entered yet.
    pub fn current_state(&self) -> Option<StateId> {
        self.core.current_state()
    }

    pub fn is_in_state(&self, id: &StateId) -> bool {
        self.core.is_in_state(id)
    }

    /// Stack from bottom to top.
    pub fn stack(&self) -> Vec<StateId> {
        self.core.stack()
    }

    pub fn stack_depth(&self) -> usize {
        self.core.stack_depth()
    }

    pub fn globals(&self) -> &[StateId] {
        self.core.globals()
    }

    pub fn is_registered(&self, id: &StateId) -> bool {
        self.core.is_registered(id)
    }

    /// Instance of `id`, if it was created already.
    pub fn state(&self, id: &StateId) -> Option<Rc<MachineState>> {
        self.core.existing(id)
    }

    pub fn stop_every_latent_execution(&self) -> usize {
        self.core.stop_every_latent_execution()
    }

    pub fn history(&self) -> StateHistory {
        self.core.history()
    }

    pub fn time(&self) -> f64 {
        self.core.time()
    }

    pub fn current_tick(&self) -> u64 {
        self.core.scheduler().current_tick()
    }

    /// Tasks known to the scheduler that have not finished.
    pub fn live_tasks(&self) -> usize {
        self.core.scheduler().live_tasks()
    }

    /// Diagnostic view of the machine.
    pub fn snapshot(&self) -> MachineSnapshot {
        let states = self
            .core
            .instances()
            .iter()
            .map(|state| StateSnapshot {
                id: state.id().clone(),
                kind: state.kind(),
                active_label: state.active_label(),
                label_activated: state.is_label_activated(),
                running_labels: state.running_label_count(),
                latent_records: state.latent_record_count(),
                labels: state.labels(),
            })
            .collect();

        MachineSnapshot {
            version: SNAPSHOT_VERSION,
            machine_id: self.id(),
            taken_at: Utc::now(),
            tick: self.current_tick(),
            time: self.time(),
            stack: self.stack(),
            globals: self.globals().to_vec(),
            states,
            history: self.core.history().transitions().cloned().collect(),
        }
    }
}

impl Drop for StateMachine {
    fn drop(&mut self) {
        self.core.teardown();
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("id", &self.id())
            .field("stack", &self.stack())
            .field("globals", &self.globals())
            .finish()
    }
}
