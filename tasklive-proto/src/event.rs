//! Push event types for live task updates.
//!
//! Events are delivered on a topic (the task board uses [`TASKS_TOPIC`])
//! and carry either a full task (created/updated) or a bare identifier
//! (deleted). The wire names match the backend's socket events.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// The topic every task board view subscribes to.
pub const TASKS_TOPIC: &str = "tasks";

/// Wire name for task creation events.
pub const EVENT_TASK_CREATED: &str = "task-created";
/// Wire name for task update events.
pub const EVENT_TASK_UPDATED: &str = "task-updated";
/// Wire name for task deletion events.
pub const EVENT_TASK_DELETED: &str = "task-deleted";

/// An asynchronously pushed notification of a remote task change.
///
/// Created and updated events carry the server's canonical task; deletion
/// carries only the identifier. These are exactly the payloads the
/// reconciliation entry points consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum TaskEvent {
    /// A task was created remotely.
    TaskCreated(Task),
    /// A task was updated remotely (full replacement payload).
    TaskUpdated(Task),
    /// A task was deleted remotely.
    TaskDeleted {
        /// Identifier of the removed task.
        id: TaskId,
    },
}

impl TaskEvent {
    /// The wire event name for this variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => EVENT_TASK_CREATED,
            Self::TaskUpdated(_) => EVENT_TASK_UPDATED,
            Self::TaskDeleted { .. } => EVENT_TASK_DELETED,
        }
    }

    /// The identifier of the task this event concerns.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskCreated(task) | Self::TaskUpdated(task) => &task.id,
            Self::TaskDeleted { id } => id,
        }
    }
}
