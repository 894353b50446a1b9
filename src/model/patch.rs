use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;

use super::error::ModelError;
use super::task::{Category, Priority, Status};

/// Fields a caller supplies when adding a task. Id, owner and timestamps
/// are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub target_pomodoros: Option<u32>,
}

impl NewTask {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: Category::default(),
            priority: Priority::default(),
            tags: BTreeSet::new(),
            target_pomodoros: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }
        match self.target_pomodoros {
            Some(0) => Err(ModelError::InvalidTargetPomodoros(0)),
            _ => Ok(()),
        }
    }
}

// `null` clears the field, a missing key leaves it alone.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Merge-patch for a task: every `Some` field replaces the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, rename = "type")]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub completed_pomodoros: Option<u32>,
    #[serde(default)]
    pub target_pomodoros: Option<u32>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn completed_pomodoros(count: u32) -> Self {
        Self {
            completed_pomodoros: Some(count),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ModelError::EmptyTitle);
            }
        }
        match self.target_pomodoros {
            Some(0) => Err(ModelError::InvalidTargetPomodoros(0)),
            _ => Ok(()),
        }
    }
}
