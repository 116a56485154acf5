//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical to-do record shared by list and edit flows.
//! - Provide display fallbacks used by every task projection.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `owner_id` is set at creation and never changes afterwards.
//! - Absent `is_finished` means "not finished".

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a task document.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = String;

/// Display fallback for a task without a name.
pub const NO_TITLE: &str = "No title";
/// Display fallback for a task without a due date.
pub const NO_DUE_DATE: &str = "No due date";

/// Canonical to-do record as stored in the task document store.
///
/// Field names on the wire follow the remote store's document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "taskID")]
    pub id: TaskId,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(rename = "taskName", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "taskDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    /// Free-form text; no calendar semantics are enforced.
    #[serde(rename = "taskDueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(
        rename = "taskIsFinished",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_finished: Option<bool>,
}

impl Task {
    /// Creates an unfinished task with a freshly generated id.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self::with_id(generate_task_id(), owner_id)
    }

    /// Creates an unfinished task with a caller-provided id.
    ///
    /// Used by edit flows and tests where identity already exists.
    pub fn with_id(id: impl Into<TaskId>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: None,
            description: None,
            due_date: None,
            is_finished: Some(false),
        }
    }

    /// Returns whether the task counts as done.
    pub fn is_done(&self) -> bool {
        self.is_finished == Some(true)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(NO_TITLE)
    }

    pub fn display_due_date(&self) -> &str {
        self.due_date.as_deref().unwrap_or(NO_DUE_DATE)
    }

    /// Secondary line shown under the task name.
    pub fn due_label(&self) -> String {
        format!("Due on {}", self.display_due_date())
    }

    /// Validates the fields the store keys and scopes documents by.
    ///
    /// Name, description and due date are free-form and never rejected.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        if self.owner_id.trim().is_empty() {
            return Err(TaskValidationError::EmptyOwner(self.id.clone()));
        }
        Ok(())
    }
}

/// Generates a random, unique task id (UUID v4 text form).
pub fn generate_task_id() -> TaskId {
    Uuid::new_v4().to_string()
}

/// Validation failure for task documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyId,
    EmptyOwner(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "task id cannot be empty"),
            Self::EmptyOwner(id) => write!(f, "task `{id}` has no owner"),
        }
    }
}

impl Error for TaskValidationError {}
