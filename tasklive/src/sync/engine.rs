//! The reconciliation engine: the authoritative in-memory task list.
//!
//! `SyncEngine` owns the snapshot the views render. Fetch results replace
//! it wholesale; push events and confirmed command results are applied
//! incrementally through entry points that are total functions — a create
//! for a known id, or an update/delete for an unknown one, is a no-op, not
//! an error. Both delivery channels (HTTP round trip and push) use the
//! same entry points, which is what makes de-duplication by identifier
//! sufficient when they race.

use std::sync::Arc;

use parking_lot::RwLock;

use tasklive_proto::task::{Task, TaskFilter, TaskId};

/// The task list snapshot and its reconciliation operations.
///
/// Ordering: newly created tasks go to the front (newest first); a fetched
/// batch keeps whatever order the backend returned. The one hard invariant
/// is uniqueness — the snapshot never holds two tasks with the same id.
#[derive(Debug, Default)]
pub struct SyncEngine {
    tasks: Vec<Task>,
}

impl SyncEngine {
    /// Creates an engine with an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Replaces the entire snapshot with a fresh fetch result.
    ///
    /// No merge with prior state — the fetch is authoritative for its
    /// request parameters. Duplicate ids in the input are collapsed to the
    /// first occurrence so the uniqueness invariant holds even against a
    /// misbehaving response.
    pub fn load_snapshot(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        for task in tasks {
            if !self.contains(&task.id) {
                self.tasks.push(task);
            }
        }
        tracing::debug!(count = self.tasks.len(), "snapshot replaced");
    }

    /// Inserts a task at the front of the snapshot iff its id is absent.
    ///
    /// The local command path and the push path for the same creation may
    /// race; the second arrival is silently absorbed. Returns whether the
    /// snapshot changed.
    pub fn apply_created(&mut self, task: Task) -> bool {
        if self.contains(&task.id) {
            tracing::debug!(id = %task.id, "duplicate create absorbed");
            return false;
        }
        self.tasks.insert(0, task);
        true
    }

    /// Replaces the task with a matching id, if present.
    ///
    /// Total replacement, not a field merge: when a local optimistic
    /// result and a push event for the same change race, the
    /// later-arriving call wins regardless of content. That is an accepted
    /// inconsistency, not a guaranteed-correct merge. An update for an id
    /// not in the snapshot (out-of-view or already deleted) is a no-op —
    /// in particular, a stale update never resurrects a deleted task.
    /// Returns whether the snapshot changed.
    pub fn apply_updated(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => {
                tracing::debug!(id = %task.id, "update for unknown task ignored");
                false
            }
        }
    }

    /// Removes the task with a matching id; no-op if absent.
    ///
    /// Returns whether the snapshot changed.
    pub fn apply_deleted(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != *id);
        before != self.tasks.len()
    }

    /// Pure projection of the snapshot through a filter.
    ///
    /// Deterministic, recomputed on every call, never mutates. List sizes
    /// are UI-bound, so no caching layer.
    #[must_use]
    pub fn filtered_view(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// The full snapshot, in order.
    #[must_use]
    pub fn snapshot(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    /// Number of tasks in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn contains(&self, id: &TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == *id)
    }
}

/// Shared handle to the engine.
///
/// The engine itself is single-writer by design; on the tokio runtime the
/// command handler and the event pump both complete on different tasks, so
/// mutations are serialized behind this lock. Views take read locks for
/// projections.
pub type SharedEngine = Arc<RwLock<SyncEngine>>;

/// Creates a fresh shared engine.
#[must_use]
pub fn shared_engine() -> SharedEngine {
    Arc::new(RwLock::new(SyncEngine::new()))
}
