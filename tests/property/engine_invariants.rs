//! Property-based tests for the reconciliation engine.
//!
//! Uses proptest to verify that arbitrary operation sequences preserve
//! the engine's invariants:
//! 1. The snapshot never holds two tasks with the same id.
//! 2. Re-applying any operation is a no-op (idempotence).
//! 3. `filtered_view` is pure and always a subset of the snapshot.
//! 4. `load_snapshot` collapses duplicate ids to the first occurrence.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use tasklive::sync::SyncEngine;
use tasklive_proto::task::{Task, TaskFilter, TaskId, TaskStatus, UserRef};

// --- Strategies ---

/// Small id space so sequences actually collide.
fn arb_task_id() -> impl Strategy<Value = TaskId> {
    (0u8..8).prop_map(|n| TaskId::from(format!("t{n}").as_str()))
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (arb_task_id(), "[a-zA-Z ]{0,24}", "[a-zA-Z ]{0,40}", arb_status()).prop_map(
        |(id, title, description, status)| {
            let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap();
            Task {
                id,
                title,
                description,
                status,
                created_by: UserRef {
                    id: "u1".to_string(),
                    username: "alice".to_string(),
                },
                tags: vec![],
                created_at: at,
                updated_at: at,
            }
        },
    )
}

/// One reconciliation operation.
#[derive(Debug, Clone)]
enum Op {
    Created(Task),
    Updated(Task),
    Deleted(TaskId),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_task().prop_map(Op::Created),
        arb_task().prop_map(Op::Updated),
        arb_task_id().prop_map(Op::Deleted),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 0..40)
}

fn arb_filter() -> impl Strategy<Value = TaskFilter> {
    (
        prop::option::of(arb_status()),
        prop::option::of("[a-zA-Z ]{0,8}"),
    )
        .prop_map(|(status, search)| TaskFilter { status, search })
}

fn apply(engine: &mut SyncEngine, op: &Op) -> bool {
    match op {
        Op::Created(task) => engine.apply_created(task.clone()),
        Op::Updated(task) => engine.apply_updated(task.clone()),
        Op::Deleted(id) => engine.apply_deleted(id),
    }
}

fn unique_ids(engine: &SyncEngine) -> bool {
    let mut seen = HashSet::new();
    engine.snapshot().iter().all(|t| seen.insert(t.id.clone()))
}

// --- Properties ---

proptest! {
    #[test]
    fn ids_stay_unique_under_any_sequence(ops in arb_ops()) {
        let mut engine = SyncEngine::new();
        for op in &ops {
            apply(&mut engine, op);
            prop_assert!(unique_ids(&engine));
        }
    }

    #[test]
    fn reapplying_any_op_changes_nothing(ops in arb_ops(), last in arb_op()) {
        let mut engine = SyncEngine::new();
        for op in &ops {
            apply(&mut engine, op);
        }

        apply(&mut engine, &last);
        let after_first: Vec<Task> = engine.snapshot().to_vec();

        let changed = apply(&mut engine, &last);
        // A replayed create is absorbed; update and delete replays are
        // either no-ops or rewrite the same value.
        if let Op::Created(_) | Op::Deleted(_) = last {
            prop_assert!(!changed);
        }
        prop_assert_eq!(engine.snapshot(), after_first.as_slice());
    }

    #[test]
    fn filtered_view_is_pure_subset(ops in arb_ops(), filter in arb_filter()) {
        let mut engine = SyncEngine::new();
        for op in &ops {
            apply(&mut engine, op);
        }

        let before: Vec<Task> = engine.snapshot().to_vec();
        let first = engine.filtered_view(&filter);
        let second = engine.filtered_view(&filter);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(engine.snapshot(), before.as_slice());
        for task in &first {
            prop_assert!(engine.snapshot().contains(task));
            prop_assert!(filter.matches(task));
        }
        // Nothing matching is left out.
        let matching = engine.snapshot().iter().filter(|t| filter.matches(t)).count();
        prop_assert_eq!(first.len(), matching);
    }

    #[test]
    fn load_snapshot_keeps_first_occurrence(tasks in prop::collection::vec(arb_task(), 0..20)) {
        let mut engine = SyncEngine::new();
        engine.load_snapshot(tasks.clone());

        prop_assert!(unique_ids(&engine));
        // Each surviving task is the first with its id in the input.
        for kept in engine.snapshot() {
            let first = tasks.iter().find(|t| t.id == kept.id).unwrap();
            prop_assert_eq!(kept, first);
        }
        // Every input id survives.
        let input_ids: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
        prop_assert_eq!(input_ids.len(), engine.len());
    }

    #[test]
    fn deleted_task_never_resurrects(ops in arb_ops(), task in arb_task()) {
        let mut engine = SyncEngine::new();
        for op in &ops {
            apply(&mut engine, op);
        }

        engine.apply_deleted(&task.id);
        prop_assert!(!engine.apply_updated(task.clone()));
        prop_assert!(engine.get(&task.id).is_none());
    }
}
