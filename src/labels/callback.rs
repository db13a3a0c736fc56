//! Label callbacks and the per-state table they are registered in.

use super::tag::LabelTag;
use crate::runtime::{LocalTask, TaskError, TaskResult};
use crate::state::LabelContext;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

type LabelFn = Rc<dyn Fn(LabelContext) -> LocalTask>;
type Liveness = Rc<dyn Fn() -> bool>;

/// Routine started when a label becomes active.
///
/// A callback is either bound to a closure, bound to an owner that may go
/// away, or unbound. Unbound callbacks are rejected at registration.
#[derive(Clone, Default)]
pub struct LabelCallback {
    func: Option<LabelFn>,
    liveness: Option<Liveness>,
}

impl LabelCallback {
    /// Bind a closure producing the label's routine.
    ///
    /// ```rust
    /// use stackmind::labels::LabelCallback;
    ///
    /// let callback = LabelCallback::new(|cx| async move {
    ///     cx.next_tick().await;
    ///     Ok(())
    /// });
    /// assert!(callback.is_bound());
    /// ```
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(LabelContext) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        Self {
            func: Some(Rc::new(move |cx| Box::pin(func(cx)) as LocalTask)),
            liveness: None,
        }
    }

    /// Bind a method-like function to a shared owner without keeping it
    /// alive. The callback reports unbound once the owner is dropped.
    pub fn bind_weak<T, F, Fut>(owner: &Rc<T>, func: F) -> Self
    where
        T: 'static,
        F: Fn(Rc<T>, LabelContext) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        let weak: Weak<T> = Rc::downgrade(owner);
        let probe = weak.clone();
        Self {
            func: Some(Rc::new(move |cx| match weak.upgrade() {
                Some(owner) => Box::pin(func(owner, cx)) as LocalTask,
                None => Box::pin(async { Err(TaskError::msg("label owner was dropped")) }),
            })),
            liveness: Some(Rc::new(move || probe.strong_count() > 0)),
        }
    }

    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some() && self.liveness.as_ref().map_or(true, |alive| alive())
    }

    /// Start the routine, or `None` when the callback is unbound.
    pub fn invoke(&self, cx: LabelContext) -> Option<LocalTask> {
        if !self.is_bound() {
            return None;
        }
        self.func.as_ref().map(|func| func(cx))
    }
}

impl fmt::Debug for LabelCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelCallback")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Per-state mapping from label tag to callback.
///
/// Entries are only added while the state is being set up and are never
/// replaced or removed afterwards.
#[derive(Default, Debug)]
pub struct LabelTable {
    labels: HashMap<LabelTag, LabelCallback>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a callback. Returns false, leaving the table untouched, when
    /// the tag is already present.
    pub fn insert(&mut self, tag: LabelTag, callback: LabelCallback) -> bool {
        if self.labels.contains_key(&tag) {
            return false;
        }
        self.labels.insert(tag, callback);
        true
    }

    pub fn get(&self, tag: &LabelTag) -> Option<&LabelCallback> {
        self.labels.get(tag)
    }

    pub fn contains(&self, tag: &LabelTag) -> bool {
        self.labels.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&LabelTag> {
        let mut tags: Vec<&LabelTag> = self.labels.keys().collect();
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::DEFAULT_LABEL;

    fn noop() -> LabelCallback {
        LabelCallback::new(|_cx| async { Ok(()) })
    }

    #[test]
    fn unbound_callback_reports_unbound() {
        assert!(!LabelCallback::unbound().is_bound());
        assert!(noop().is_bound());
    }

    #[test]
    fn weak_callback_unbinds_when_owner_drops() {
        let owner = Rc::new(5u32);
        let callback = LabelCallback::bind_weak(&owner, |_owner, _cx| async { Ok(()) });
        assert!(callback.is_bound());

        drop(owner);
        assert!(!callback.is_bound());
    }

    #[test]
    fn table_rejects_duplicates_and_keeps_first() {
        let mut table = LabelTable::new();
        let first = noop();
        assert!(table.insert(DEFAULT_LABEL, first));
        assert!(!table.insert(DEFAULT_LABEL, LabelCallback::unbound()));

        assert_eq!(table.len(), 1);
        assert!(table.get(&DEFAULT_LABEL).unwrap().is_bound());
    }

    #[test]
    fn tags_are_sorted() {
        let mut table = LabelTable::new();
        table.insert(LabelTag::new("StateMachine.Label.Zeta"), noop());
        table.insert(LabelTag::new("StateMachine.Label.Alpha"), noop());

        let tags: Vec<&str> = table.tags().into_iter().map(LabelTag::as_str).collect();
        assert_eq!(tags, vec!["StateMachine.Label.Alpha", "StateMachine.Label.Zeta"]);
    }
}
