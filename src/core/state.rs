//! State descriptors.
//!
//! A `StateId` names a state type. It is the key for stack membership
//! checks and the target of every transition request.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of a state type.
///
/// Descriptors are cheap to clone and can be declared as constants:
///
/// ```rust
/// use stackmind::core::StateId;
///
/// const IDLE: StateId = StateId::from_static("Idle");
///
/// assert_eq!(IDLE.name(), "Idle");
/// assert_eq!(IDLE, StateId::new("Idle"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(Cow<'static, str>);

impl StateId {
    /// Create a descriptor from a static name, usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a descriptor from any owned or borrowed name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the state's name for display/logging.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StateId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const PATROL: StateId = StateId::from_static("Patrol");

    #[test]
    fn static_and_owned_descriptors_are_equal() {
        assert_eq!(PATROL, StateId::new(String::from("Patrol")));
        assert_ne!(PATROL, StateId::new("Attack"));
    }

    #[test]
    fn descriptor_hashes_by_name() {
        let mut set = HashSet::new();
        set.insert(PATROL);
        assert!(set.contains(&StateId::new("Patrol")));
    }

    #[test]
    fn descriptor_serializes_as_plain_string() {
        let json = serde_json::to_string(&PATROL).unwrap();
        assert_eq!(json, "\"Patrol\"");
        let back: StateId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PATROL);
    }

    #[test]
    fn display_shows_name() {
        assert_eq!(PATROL.to_string(), "Patrol");
        assert_eq!(format!("{:?}", PATROL), "StateId(Patrol)");
    }
}
