use thiserror::*;

use super::storage::StorageError;
use crate::model::{ModelError, OwnerId, Task, TaskId};

#[derive(Debug, PartialEq, Error)]
pub enum DataStoreError {
    #[error("creating task '{}' failed: {}", .task.title, .source)]
    CreateFailed {
        task: Box<Task>,
        source: StorageError,
    },

    #[error("updating task {} failed: {}", .task.id, .source)]
    UpdateFailed {
        task: Box<Task>,
        source: StorageError,
    },

    #[error("deleting task {id} failed: {source}")]
    DeleteFailed { id: TaskId, source: StorageError },

    #[error("subscription for owner {owner} failed: {source}")]
    SubscriptionFailed { owner: OwnerId, source: StorageError },

    #[error("task not found {0}")]
    NotFound(TaskId),

    #[error("invalid task: {0}")]
    Invalid(#[from] ModelError),
}
