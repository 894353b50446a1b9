use thiserror::*;

use crate::model::TaskId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("the item exists {0}")]
    Conflict(TaskId),

    #[error("the item not found {0}")]
    NotFound(TaskId),

    #[error("the storage rejects writes")]
    ReadOnly,

    #[error("the snapshot feed was closed by the storage")]
    FeedClosed,
}
