//! Time sources.

use std::cell::Cell;

/// Source of the current time, in seconds.
///
/// The orchestrator calls `advance` with each tick's delta. Clocks backed by
/// an external world time may ignore it.
pub trait Clock {
    fn now(&self) -> f64;

    fn advance(&self, _delta: f64) {}
}

/// Clock that only moves when the state machine ticks.
#[derive(Debug, Default)]
pub struct TickClock {
    now: Cell<f64>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            now: Cell::new(seconds),
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn advance(&self, delta: f64) {
        if delta > 0.0 {
            self.now.set(self.now.get() + delta);
        }
    }
}
