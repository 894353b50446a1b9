use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::model::{Category, Priority, Task, TaskStatus};

/// Query over the in-memory list, as used by the history view.
///
/// Both ends of the date range are inclusive. A task matches `tags` when it
/// carries any one of them.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    pub status: Option<TaskStatus>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub tags: BTreeSet<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Filter {
    pub fn completed_tasks() -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            ..Self::default()
        }
    }

    pub fn pending_tasks() -> Self {
        Self {
            status: Some(TaskStatus::Pending),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if task.category != category {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&task.tags) {
            return false;
        }
        if let Some(from) = self.from {
            if task.created_at < from {
                return false;
            }
        }
        match self.until {
            Some(until) => task.created_at <= until,
            None => true,
        }
    }
}
