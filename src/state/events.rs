//! Publish/subscribe channel for state-action events.

use crate::core::StateActionEvent;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

type Listener = Rc<dyn Fn(&StateActionEvent)>;
type Listeners = RefCell<Vec<(Uuid, Listener)>>;

/// Fire-and-forget broadcast of lifecycle events to any number of
/// listeners.
#[derive(Default)]
pub struct StateActionChannel {
    listeners: Rc<Listeners>,
}

impl StateActionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&StateActionEvent) + 'static) -> Subscription {
        let id = Uuid::new_v4();
        self.listeners
            .borrow_mut()
            .push((id, Rc::new(listener) as Listener));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to the listeners registered when the broadcast
    /// starts.
    pub fn broadcast(&self, event: &StateActionEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl fmt::Debug for StateActionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateActionChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener
/// registered; call `cancel` to remove it.
#[derive(Clone)]
pub struct Subscription {
    id: Uuid,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the listener. Returns false if it was already removed or the
    /// channel is gone.
    pub fn cancel(&self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        before != listeners.len()
    }

    pub fn is_active(&self) -> bool {
        self.listeners
            .upgrade()
            .map_or(false, |listeners| listeners.borrow().iter().any(|(id, _)| *id == self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
