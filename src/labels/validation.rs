//! Validation rules for label registration and label switches.
//!
//! Rules are evaluated with Stillwater's `Validation` so that every broken
//! rule is reported in one pass. Callers receive the first violation as a
//! plain `Result`; all of them are logged.

use super::callback::{LabelCallback, LabelTable};
use super::error::LabelError;
use super::tag::{LabelNamespace, LabelTag, DEFAULT_LABEL};
use crate::core::StateId;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub type LabelValidation = Validation<(), NonEmptyVec<LabelError>>;

fn check(passed: bool, violation: impl FnOnce() -> LabelError) -> LabelValidation {
    if passed {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Whether `tag` is a valid label under `namespace`. The built-in default
/// label is valid under every namespace.
pub fn in_namespace(namespace: &dyn LabelNamespace, tag: &LabelTag) -> bool {
    *tag == DEFAULT_LABEL || namespace.contains(tag)
}

fn hierarchy(namespace: &dyn LabelNamespace, tag: &LabelTag) -> LabelValidation {
    check(in_namespace(namespace, tag), || LabelError::WrongHierarchy {
        label: tag.clone(),
    })
}

/// Rules for adding `tag` to a state's table.
pub fn validate_registration(
    namespace: &dyn LabelNamespace,
    table: &LabelTable,
    state: &StateId,
    tag: &LabelTag,
    callback: &LabelCallback,
) -> LabelValidation {
    let checks = vec![
        hierarchy(namespace, tag),
        check(callback.is_bound(), || LabelError::Unbound { label: tag.clone() }),
        check(!table.contains(tag), || LabelError::AlreadyRegistered {
            label: tag.clone(),
            state: state.clone(),
        }),
    ];
    Validation::all_vec(checks).map(|_| ())
}

/// Rules for making `tag` the active label of a state.
pub fn validate_switch(
    namespace: &dyn LabelNamespace,
    table: &LabelTable,
    state: &StateId,
    tag: &LabelTag,
) -> LabelValidation {
    let checks = vec![
        hierarchy(namespace, tag),
        check(table.contains(tag), || LabelError::NotRegistered {
            label: tag.clone(),
            state: state.clone(),
        }),
    ];
    Validation::all_vec(checks).map(|_| ())
}

/// Log every violation and keep the first one.
pub fn first_violation(state: &StateId, validation: LabelValidation) -> Result<(), LabelError> {
    match validation {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => {
            for error in errors.iter() {
                tracing::warn!(state = %state, label = %error.label(), %error, "label rejected");
            }
            match errors.iter().next() {
                Some(first) => Err(first.clone()),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{TagNamespace, DEFAULT_LABEL};

    const STATE: StateId = StateId::from_static("Guard");

    fn noop() -> LabelCallback {
        LabelCallback::new(|_cx| async { Ok(()) })
    }

    #[test]
    fn valid_registration_passes() {
        let table = LabelTable::new();
        let result = validate_registration(
            &TagNamespace::default(),
            &table,
            &STATE,
            &DEFAULT_LABEL,
            &noop(),
        );
        assert!(result.is_success());
    }

    #[test]
    fn registration_accumulates_all_violations() {
        let mut table = LabelTable::new();
        let bad = LabelTag::new("Ability.Fire");
        table.insert(bad.clone(), noop());

        let result = validate_registration(
            &TagNamespace::default(),
            &table,
            &STATE,
            &bad,
            &LabelCallback::unbound(),
        );

        match result {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, LabelError::WrongHierarchy { .. })));
                assert!(errors.iter().any(|e| matches!(e, LabelError::Unbound { .. })));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, LabelError::AlreadyRegistered { .. })));
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    #[test]
    fn switch_requires_registered_label() {
        let table = LabelTable::new();
        let result = validate_switch(&TagNamespace::default(), &table, &STATE, &DEFAULT_LABEL);

        assert_eq!(
            first_violation(&STATE, result),
            Err(LabelError::NotRegistered {
                label: DEFAULT_LABEL,
                state: STATE,
            })
        );
    }

    #[test]
    fn default_label_passes_any_namespace() {
        let namespace = TagNamespace::new(LabelTag::new("Npc.Label"));
        let table = LabelTable::new();

        let result = validate_registration(&namespace, &table, &STATE, &DEFAULT_LABEL, &noop());

        assert!(result.is_success());
        assert!(!in_namespace(&namespace, &LabelTag::new("StateMachine.Label.Patrol")));
    }

    #[test]
    fn first_violation_follows_rule_order() {
        let table = LabelTable::new();
        let tag = LabelTag::new("Wrong.Root");
        let result = validate_switch(&TagNamespace::default(), &table, &STATE, &tag);

        assert_eq!(
            first_violation(&STATE, result),
            Err(LabelError::WrongHierarchy { label: tag })
        );
    }
}
