//! Property-based tests for labels, the state stack and history.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use stackmind::core::StateId;
use stackmind::labels::{LabelCallback, LabelError, LabelTag, DEFAULT_LABEL, LABEL_ROOT};
use stackmind::machine::{MachineConfig, StateMachine, StateMachineBuilder, TransitionError};
use stackmind::state::StateSpec;
use std::collections::BTreeSet;

const STATES: [StateId; 4] = [
    StateId::from_static("Idle"),
    StateId::from_static("Patrol"),
    StateId::from_static("Alert"),
    StateId::from_static("Menu"),
];

#[derive(Clone, Debug)]
enum StackOp {
    Goto(usize),
    Push(usize),
    Pop,
}

prop_compose! {
    fn arbitrary_leaf()(variant in 0..6u8) -> &'static str {
        match variant {
            0 => "Default",
            1 => "Patrol",
            2 => "Alert",
            3 => "Alert.Search",
            4 => "Flee",
            _ => "Idle",
        }
    }
}

fn arbitrary_op() -> impl Strategy<Value = StackOp> {
    prop_oneof![
        (0..STATES.len()).prop_map(StackOp::Goto),
        (0..STATES.len()).prop_map(StackOp::Push),
        Just(StackOp::Pop),
    ]
}

fn noop() -> LabelCallback {
    LabelCallback::new(|_cx| async { Ok(()) })
}

fn parked() -> LabelCallback {
    LabelCallback::new(|cx| async move {
        cx.wait_ticks(1_000_000).await;
        Ok(())
    })
}

fn stack_machine(history_limit: usize) -> StateMachine {
    STATES
        .iter()
        .fold(StateMachineBuilder::new(), |builder, id| {
            builder.state(id.clone(), StateSpec::new())
        })
        .config(MachineConfig {
            history_limit,
            ..MachineConfig::default()
        })
        .initial(STATES[0].clone())
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn label_registration_keeps_one_callback_per_tag(
        leaves in prop::collection::vec(arbitrary_leaf(), 0..12)
    ) {
        let machine = stack_machine(16);
        let state = machine.state(&STATES[0]).unwrap();
        let mut expected: BTreeSet<String> = BTreeSet::new();
        expected.insert(DEFAULT_LABEL.as_str().to_string());

        for leaf in &leaves {
            let tag = LabelTag::new(format!("{}.{}", LABEL_ROOT, leaf));
            let fresh = expected.insert(tag.as_str().to_string());
            let result = state.register_label(tag.clone(), noop());

            if fresh {
                prop_assert!(result.is_ok());
            } else {
                let is_duplicate = matches!(result, Err(LabelError::AlreadyRegistered { .. }));
                prop_assert!(is_duplicate);
            }
        }

        let registered: Vec<String> = state
            .labels()
            .iter()
            .map(|tag| tag.as_str().to_string())
            .collect();
        prop_assert_eq!(registered, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn tags_outside_namespace_are_rejected(leaf in "[a-z]{1,10}") {
        let machine = stack_machine(16);
        let state = machine.state(&STATES[0]).unwrap();
        let before = state.labels().len();

        let result = state.register_label(LabelTag::new(leaf), noop());

        let is_wrong_hierarchy = matches!(result, Err(LabelError::WrongHierarchy { .. }));
        prop_assert!(is_wrong_hierarchy);
        prop_assert_eq!(state.labels().len(), before);
    }

    #[test]
    fn dotted_descendants_match_their_root(leaf in "[A-Za-z]{1,10}") {
        let tag = LabelTag::new(format!("{}.{}", LABEL_ROOT, leaf));
        let glued = LabelTag::new(format!("{}{}", LABEL_ROOT, leaf));

        prop_assert!(tag.matches(&LABEL_ROOT));
        prop_assert!(tag.is_label());
        prop_assert!(!glued.matches(&LABEL_ROOT));
        prop_assert_eq!(tag.leaf(), leaf.as_str());
    }

    #[test]
    fn stack_follows_reference_model(ops in prop::collection::vec(arbitrary_op(), 0..24)) {
        let machine = stack_machine(256);
        let mut model = vec![STATES[0].clone()];

        for op in ops {
            match op {
                StackOp::Goto(index) => {
                    let target = STATES[index].clone();
                    let result = machine.goto_state(target.clone(), DEFAULT_LABEL);
                    let top_index = model.len() - 1;
                    if model[top_index] == target {
                        prop_assert!(result.is_ok());
                    } else if model.contains(&target) {
                        let in_stack = matches!(result, Err(TransitionError::AlreadyInStack { .. }));
                        prop_assert!(in_stack);
                    } else {
                        prop_assert!(result.is_ok());
                        model[top_index] = target;
                    }
                }
                StackOp::Push(index) => {
                    let target = STATES[index].clone();
                    let result = machine.push_state(target.clone(), DEFAULT_LABEL);
                    if model.contains(&target) {
                        let in_stack = matches!(result, Err(TransitionError::AlreadyInStack { .. }));
                        prop_assert!(in_stack);
                    } else {
                        prop_assert!(result.is_ok());
                        model.push(target);
                    }
                }
                StackOp::Pop => {
                    let result = machine.pop_state();
                    if model.len() > 1 {
                        prop_assert!(result.is_ok());
                        model.pop();
                    } else {
                        let last = matches!(result, Err(TransitionError::CannotPopLast { .. }));
                        prop_assert!(last);
                    }
                }
            }

            prop_assert_eq!(machine.stack(), model.clone());
            prop_assert_eq!(machine.current_state(), model.last().cloned());
        }
    }

    #[test]
    fn history_never_exceeds_limit(
        limit in 1usize..8,
        targets in prop::collection::vec(0..STATES.len(), 0..20)
    ) {
        let machine = stack_machine(limit);

        for index in targets {
            let _ = machine.goto_state(STATES[index].clone(), DEFAULT_LABEL);
        }

        let history = machine.history();
        prop_assert!(history.len() <= limit);
        let last = history.last().map(|transition| transition.to.clone());
        prop_assert_eq!(last, machine.current_state());
    }

    #[test]
    fn stopping_labels_is_idempotent(ticks in 1usize..6) {
        let machine = StateMachineBuilder::new()
            .state(
                STATES[0].clone(),
                StateSpec::new().label(LabelTag::new("StateMachine.Label.Watch"), parked()),
            )
            .initial_with_label(STATES[0].clone(), LabelTag::new("StateMachine.Label.Watch"))
            .build()
            .unwrap();
        for _ in 0..ticks {
            machine.tick(0.016);
        }
        let state = machine.state(&STATES[0]).unwrap();

        prop_assert_eq!(state.stop_running_labels(), 1);
        prop_assert_eq!(state.stop_running_labels(), 0);
        prop_assert_eq!(state.running_label_count(), 0);
    }
}
