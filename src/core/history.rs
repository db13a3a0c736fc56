//! State transition history tracking.
//!
//! The orchestrator records every goto, push and pop it completes. The
//! history is bounded: once the limit is reached the oldest records are
//! discarded.

use super::state::StateId;
use crate::labels::LabelTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Kind of stack transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The top frame was replaced.
    Goto,
    /// A frame was appended on top of the stack.
    Push,
    /// The top frame was removed.
    Pop,
}

/// Record of a single completed transition.
///
/// # Example
///
/// ```rust
/// use stackmind::core::{StateId, StateTransition, TransitionKind};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     kind: TransitionKind::Goto,
///     from: Some(StateId::from_static("Idle")),
///     to: StateId::from_static("Patrol"),
///     label: None,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to.name(), "Patrol");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub kind: TransitionKind,
    /// Top of the stack before the transition, if the stack was not empty
    pub from: Option<StateId>,
    /// Top of the stack after the transition
    pub to: StateId,
    /// Label the new top was armed with, for goto and push
    pub label: Option<LabelTag>,
    /// When the transition completed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of state transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    limit: usize,
    transitions: VecDeque<StateTransition>,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::with_limit(256)
    }
}

impl StateHistory {
    /// Create an empty history that keeps at most `limit` records.
    ///
    /// A limit of zero disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            transitions: VecDeque::new(),
        }
    }

    /// Record a transition, dropping the oldest record when full.
    pub fn record(&mut self, transition: StateTransition) {
        if self.limit == 0 {
            return;
        }
        while self.transitions.len() >= self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Sequence of stack tops visited, starting with the first recorded
    /// origin when there was one.
    pub fn get_path(&self) -> Vec<&StateId> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.front().and_then(|t| t.from.as_ref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time elapsed between the first and the last retained record.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition> {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&StateTransition> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: StateId = StateId::from_static("Idle");
    const PATROL: StateId = StateId::from_static("Patrol");
    const ALERT: StateId = StateId::from_static("Alert");

    fn goto(from: Option<StateId>, to: StateId) -> StateTransition {
        StateTransition {
            kind: TransitionKind::Goto,
            from,
            to,
            label: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::default();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let mut history = StateHistory::default();
        history.record(goto(Some(IDLE), PATROL));
        history.record(goto(Some(PATROL), ALERT));

        let path = history.get_path();
        assert_eq!(path, vec![&IDLE, &PATROL, &ALERT]);
    }

    #[test]
    fn path_skips_missing_origin() {
        let mut history = StateHistory::default();
        history.record(goto(None, IDLE));

        assert_eq!(history.get_path(), vec![&IDLE]);
    }

    #[test]
    fn limit_discards_oldest_records() {
        let mut history = StateHistory::with_limit(2);
        history.record(goto(None, IDLE));
        history.record(goto(Some(IDLE), PATROL));
        history.record(goto(Some(PATROL), ALERT));

        assert_eq!(history.len(), 2);
        assert_eq!(history.transitions().next().unwrap().to, PATROL);
        assert_eq!(history.last().unwrap().to, ALERT);
    }

    #[test]
    fn zero_limit_records_nothing() {
        let mut history = StateHistory::with_limit(0);
        history.record(goto(None, IDLE));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let mut history = StateHistory::default();
        let start = Utc::now();
        let mut first = goto(None, IDLE);
        first.timestamp = start;
        let mut second = goto(Some(IDLE), PATROL);
        second.timestamp = start + chrono::Duration::seconds(5);

        history.record(first);
        history.record(second);

        assert_eq!(history.duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn history_serializes_roundtrip() {
        let mut history = StateHistory::default();
        history.record(goto(None, IDLE));
        let json = serde_json::to_string(&history).unwrap();
        let back: StateHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.last().unwrap().to, IDLE);
    }
}
