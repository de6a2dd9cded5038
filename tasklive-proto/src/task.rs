//! Task domain types shared by the client, the hub, and the test fixtures.
//!
//! Field names and the status vocabulary follow the backend's JSON
//! representation (`_id`, camelCase keys, kebab-case statuses), so these
//! types deserialize API responses and push payloads directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Unique identifier for a task.
///
/// Identifiers are assigned by the backend and are opaque to the client;
/// the client never mints one. Stable and unique for the task's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a server-assigned identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started yet.
    Pending,
    /// Actively being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// All statuses in workflow order, for cycling in the UI.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Reference to the user who created a task (identifier + display name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// The user's identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// The user's display name.
    pub username: String,
}

/// A task as the backend represents it.
///
/// The identifier is immutable; every other field can change between
/// observations of the same task. Equality is structural — two `Task`
/// values with the same id but different fields are different revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Longer free-form description.
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Who created the task.
    pub created_by: UserRef,
    /// Free-form tags, insertion order preserved.
    pub tags: Vec<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Form data for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForm {
    /// Task title (required, bounded length).
    pub title: String,
    /// Description (may be empty).
    pub description: String,
    /// Initial status.
    pub status: TaskStatus,
    /// Tags, de-duplicated by the editor on add.
    pub tags: Vec<String>,
}

impl TaskForm {
    /// Validates the form before it is sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::TitleEmpty`] if the title is blank, or
    /// [`FormError::TitleTooLong`] if it exceeds
    /// [`MAX_TASK_TITLE_LENGTH`] characters.
    pub fn validate(&self) -> Result<(), FormError> {
        validate_title(&self.title)
    }
}

/// Partial update for a task. `None` fields are omitted from the request
/// body, so the backend only touches what the client actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New tag list, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    /// A patch that changes only the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Validates the patch before it is sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] if a new title is present and invalid.
    pub fn validate(&self) -> Result<(), FormError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// Client-side validation failures, caught before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
}

fn validate_title(title: &str) -> Result<(), FormError> {
    if title.trim().is_empty() {
        return Err(FormError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(FormError::TitleTooLong);
    }
    Ok(())
}

/// View filter over a task list: optional status, optional case-insensitive
/// substring search over title and description.
///
/// Doubles as the query parameters for the task list endpoint, so a fetch
/// and the local projection always agree on what "matching" means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks with this status, when set.
    pub status: Option<TaskStatus>,
    /// Only tasks whose title or description contains this substring
    /// (case-insensitive), when set and non-empty.
    pub search: Option<String>,
}

impl TaskFilter {
    /// True when the filter excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.search.as_deref().is_none_or(str::is_empty)
    }

    /// Whether the given task passes this filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(search) = self.search.as_deref()
            && !search.is_empty()
        {
            let needle = search.to_lowercase();
            return task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle);
        }
        true
    }
}
