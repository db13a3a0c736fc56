//! Context handed to running labels.

use super::machine_state::MachineState;
use crate::core::StateId;
use crate::labels::{LabelError, LabelTag};
use crate::machine::{PushCompletion, TransitionError};
use crate::runtime::{Delay, NextTick, TaskHandle, TaskResult, TimerHandle};
use std::cell::{Ref, RefMut};
use std::future::Future;
use std::rc::Rc;

/// Handle a label routine uses to reach its state and the machine.
///
/// The context keeps the state alive for as long as the routine runs.
#[derive(Clone)]
pub struct LabelContext {
    state: Rc<MachineState>,
}

impl LabelContext {
    pub(crate) fn new(state: Rc<MachineState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Rc<MachineState> {
        &self.state
    }

    pub fn id(&self) -> &StateId {
        self.state.id()
    }

    /// Suspend until the next tick.
    pub fn next_tick(&self) -> NextTick {
        self.state.machine().next_tick()
    }

    /// Suspend for `ticks` ticks.
    pub fn wait_ticks(&self, ticks: u64) -> NextTick {
        self.state.machine().wait_ticks(ticks)
    }

    /// Suspend until the machine clock advanced by `seconds`.
    pub fn delay(&self, seconds: f64) -> Delay {
        self.state.delay(seconds)
    }

    pub fn time(&self) -> f64 {
        self.state.time()
    }

    pub fn time_since(&self, time: f64) -> f64 {
        self.state.time_since(time)
    }

    pub fn goto_label(&self, label: LabelTag) -> Result<(), LabelError> {
        self.state.goto_label(label)
    }

    pub fn goto_state(&self, target: StateId, label: LabelTag) -> Result<(), TransitionError> {
        self.state.goto_state(target, label)
    }

    /// Push `target` and suspend until it is popped again.
    pub fn push_state(&self, target: StateId, label: LabelTag) -> PushCompletion {
        self.state.push_state(target, label)
    }

    pub fn pop_state(&self) -> Result<(), TransitionError> {
        self.state.pop_state()
    }

    pub fn data<T: 'static>(&self) -> Option<Ref<'_, T>> {
        self.state.data::<T>()
    }

    pub fn data_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        self.state.data_mut::<T>()
    }

    pub fn run_after(&self, delay: f64, callback: impl FnOnce(&MachineState) + 'static) -> TimerHandle {
        self.state.run_after(delay, callback)
    }

    pub fn spawn_latent<F>(&self, name: impl Into<String>, future: F) -> TaskHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        self.state.spawn_latent(name, future)
    }
}
