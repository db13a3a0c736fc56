//! Errors raised by the orchestrator and its builder.

use crate::core::StateId;
use crate::labels::LabelError;
use thiserror::Error;

/// A transition that cannot be carried out. The stack is left unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("State [{state}] is not registered in this machine")]
    UnknownState { state: StateId },

    #[error("State [{state}] is global and cannot be placed on the stack")]
    GlobalTarget { state: StateId },

    #[error("State [{state}] is already on the stack")]
    AlreadyInStack { state: StateId },

    #[error("State [{state}] is the bottom of the stack and cannot be popped")]
    CannotPopLast { state: StateId },

    #[error("The state stack is empty")]
    Empty,

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Misconfiguration detected while building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("State [{state}] is registered twice")]
    DuplicateState { state: StateId },

    #[error("Initial state [{state}] is not registered")]
    UnknownInitialState { state: StateId },

    #[error("Initial state [{state}] is global")]
    GlobalInitialState { state: StateId },

    #[error("Initial transition failed: {0}")]
    InitialTransition(#[from] TransitionError),

    #[error("Invalid machine configuration: {0}")]
    InvalidConfig(String),
}

/// Errors encoding or decoding a machine snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
