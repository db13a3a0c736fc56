//! Hierarchical label tags and the namespace authority that validates them.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Root of the label namespace. Every label is this tag or a descendant.
pub const LABEL_ROOT: LabelTag = LabelTag::from_static("StateMachine.Label");

/// The built-in label every state starts on and returns to after teardown.
pub const DEFAULT_LABEL: LabelTag = LabelTag::from_static("StateMachine.Label.Default");

/// Dotted hierarchical tag identifying a label, e.g.
/// `StateMachine.Label.Patrol`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTag(Cow<'static, str>);

impl LabelTag {
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this tag is `parent` itself or one of its dotted descendants.
    ///
    /// ```rust
    /// use stackmind::labels::LabelTag;
    ///
    /// let root = LabelTag::new("StateMachine.Label");
    /// assert!(LabelTag::new("StateMachine.Label.Patrol").matches(&root));
    /// assert!(!LabelTag::new("StateMachine.Labels").matches(&root));
    /// ```
    pub fn matches(&self, parent: &LabelTag) -> bool {
        if self.0.is_empty() || parent.0.is_empty() {
            return false;
        }
        match self.0.strip_prefix(parent.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.') && rest.len() > 1,
            None => false,
        }
    }

    /// Whether this tag belongs to the built-in label namespace.
    pub fn is_label(&self) -> bool {
        self.matches(&LABEL_ROOT)
    }

    /// Last segment of the tag, used for compact log output.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or_default()
    }
}

impl fmt::Debug for LabelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelTag({})", self.0)
    }
}

impl fmt::Display for LabelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authority deciding which tags are valid label identifiers.
pub trait LabelNamespace {
    fn contains(&self, tag: &LabelTag) -> bool;
}

/// Namespace made of one root tag and all of its descendants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagNamespace {
    root: LabelTag,
}

impl TagNamespace {
    pub fn new(root: LabelTag) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &LabelTag {
        &self.root
    }
}

impl Default for TagNamespace {
    fn default() -> Self {
        Self::new(LABEL_ROOT)
    }
}

impl LabelNamespace for TagNamespace {
    fn contains(&self, tag: &LabelTag) -> bool {
        tag.matches(&self.root)
    }
}
