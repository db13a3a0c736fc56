//! Label validation errors.

use super::tag::LabelTag;
use crate::core::StateId;
use thiserror::Error;

/// Reasons a label could not be registered or switched to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("Label [{label}] is of wrong tag hierarchy")]
    WrongHierarchy { label: LabelTag },

    #[error("Label [{label}]'s callback is not bound")]
    Unbound { label: LabelTag },

    #[error("Label [{label}] is already registered in state [{state}]")]
    AlreadyRegistered { label: LabelTag, state: StateId },

    #[error("Label [{label}] is not present in state [{state}]")]
    NotRegistered { label: LabelTag, state: StateId },
}

impl LabelError {
    pub fn label(&self) -> &LabelTag {
        match self {
            Self::WrongHierarchy { label }
            | Self::Unbound { label }
            | Self::AlreadyRegistered { label, .. }
            | Self::NotRegistered { label, .. } => label,
        }
    }
}
