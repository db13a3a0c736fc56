//! Serializable diagnostic snapshots of a machine.
//!
//! Snapshots describe the stack, the states and the history at one point in
//! time. Running routines cannot be captured, so a snapshot is a report for
//! tooling, not a way to resume a machine.

use super::error::SnapshotError;
use crate::core::{StateId, StateTransition};
use crate::labels::LabelTag;
use crate::state::StateKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-state part of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: StateId,
    pub kind: StateKind,
    pub active_label: LabelTag,
    pub label_activated: bool,
    /// Label routines not finished yet
    pub running_labels: usize,
    /// Stored latent cancellers, live or stale
    pub latent_records: usize,
    pub labels: Vec<LabelTag>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Snapshot format version
    pub version: u32,
    pub machine_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub tick: u64,
    /// Machine clock, in seconds
    pub time: f64,
    /// Stack from bottom to top
    pub stack: Vec<StateId>,
    pub globals: Vec<StateId>,
    /// Every instantiated state, sorted by descriptor
    pub states: Vec<StateSnapshot>,
    pub history: Vec<StateTransition>,
}

impl MachineSnapshot {
    pub fn state(&self, id: &StateId) -> Option<&StateSnapshot> {
        self.states.iter().find(|state| &state.id == id)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}
