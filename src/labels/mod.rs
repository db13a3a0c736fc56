//! Labels: the named, restartable routines a state runs.
//!
//! A label is identified by a hierarchical `LabelTag` that must belong to
//! the label namespace, and is backed by a `LabelCallback` producing the
//! routine. Each state keeps its labels in a `LabelTable`.
//!
//! # Example
//!
//! ```rust
//! use stackmind::labels::{LabelCallback, LabelTable, LabelTag, DEFAULT_LABEL};
//!
//! let mut table = LabelTable::new();
//! assert!(table.insert(DEFAULT_LABEL, LabelCallback::new(|_cx| async { Ok(()) })));
//! assert!(table.contains(&LabelTag::new("StateMachine.Label.Default")));
//! ```

mod callback;
mod error;
mod macros;
mod tag;
pub mod validation;

pub use callback::{LabelCallback, LabelTable};
pub use error::LabelError;
pub use tag::{LabelNamespace, LabelTag, TagNamespace, DEFAULT_LABEL, LABEL_ROOT};
