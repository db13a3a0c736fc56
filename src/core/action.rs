//! State actions and the events broadcast when they fire.

use super::state::StateId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle action the orchestrator routes to a state.
///
/// The set is closed: every transition is expressed through these six
/// actions, and nothing else may be dispatched to a state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum StateAction {
    /// The state became the top of the stack (or a global state started).
    Begin,
    /// The state was replaced by a goto transition.
    End,
    /// The state was entered through a push.
    Push,
    /// The state was removed from the top of the stack by a pop.
    Pop,
    /// A state was pushed on top of this one.
    Pause,
    /// The state above this one was popped.
    Resume,
}

impl StateAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Begin => "Begin",
            Self::End => "End",
            Self::Push => "Push",
            Self::Pop => "Pop",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
        }
    }

    /// Whether the action only makes sense for states living on the stack.
    ///
    /// Global states never receive these.
    pub fn is_stack_only(&self) -> bool {
        matches!(self, Self::Push | Self::Pop | Self::Pause | Self::Resume)
    }
}

impl fmt::Display for StateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Notification that a lifecycle hook fired on a state.
///
/// `related` carries the previous state for `Begin` and the next state for
/// `End`; the other actions have no payload.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StateActionEvent {
    pub state: StateId,
    pub action: StateAction,
    pub related: Option<StateId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_only_actions_are_the_four_push_pop_hooks() {
        assert!(!StateAction::Begin.is_stack_only());
        assert!(!StateAction::End.is_stack_only());
        assert!(StateAction::Push.is_stack_only());
        assert!(StateAction::Pop.is_stack_only());
        assert!(StateAction::Pause.is_stack_only());
        assert!(StateAction::Resume.is_stack_only());
    }

    #[test]
    fn action_displays_its_name() {
        assert_eq!(StateAction::Resume.to_string(), "Resume");
    }
}
