use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::error::ModelError;
use super::patch::{NewTask, TaskPatch};
use super::OwnerId;

const TEMPORARY_PREFIX: &str = "temp-";

pub const DEFAULT_TARGET_POMODOROS: u32 = 1;

/// Identifier of a task. Optimistic inserts carry a `temp-` id until the
/// remote store assigns the real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        TaskId(id.into())
    }

    pub fn temporary() -> Self {
        TaskId(format!("{}{}", TEMPORARY_PREFIX, Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }

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
        TaskId::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Main,
    Secondary,
    Additional,
    Mini,
}

impl Default for Category {
    fn default() -> Self {
        Category::Main
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Completed,
}

impl Default for Status {
    fn default() -> Self {
        Status::Pending
    }
}

fn default_target_pomodoros() -> u32 {
    DEFAULT_TARGET_POMODOROS
}

/// A planned piece of work, the only record the remote store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_pomodoros: u32,
    #[serde(default = "default_target_pomodoros")]
    pub target_pomodoros: u32,
}

impl Task {
    pub fn new(
        id: TaskId,
        owner: OwnerId,
        draft: NewTask,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Task, ModelError> {
        draft.validate()?;
        let mut task = Self {
            id,
            owner,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            status: Status::Pending,
            tags: draft.tags,
            created_at,
            updated_at: created_at,
            completed_at: None,
            completed_pomodoros: 0,
            target_pomodoros: draft.target_pomodoros.unwrap_or(DEFAULT_TARGET_POMODOROS),
        };
        task.touch(now);
        Ok(task)
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Refreshes `updated_at`; it never moves backwards nor before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    /// Moving to completed stamps `completed_at`, moving away clears it.
    pub fn set_status(&mut self, status: Status, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = match status {
            Status::Completed => Some(now),
            Status::Pending => None,
        };
    }

    /// Merges the provided fields. Nothing changes when the patch is invalid.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) -> Result<(), ModelError> {
        patch.validate()?;
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(completed) = patch.completed_pomodoros {
            self.completed_pomodoros = completed;
        }
        if let Some(target) = patch.target_pomodoros {
            self.target_pomodoros = target;
        }
        self.touch(now);
        Ok(())
    }
}

/// Newest first. Stable, so equal timestamps keep their relative order.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
