mod error;
mod feed;
mod memory;

use crate::model::{OwnerId, Task, TaskId};
pub use error::StorageError;
pub use feed::{SnapshotFeed, SnapshotSender};
pub use memory::MemoryTaskStorage;

// Remote document store holding every owner's tasks
#[async_trait::async_trait]
pub trait TaskStorage: Sync + Send + 'static {
    /// Persists a new task and returns the id the storage assigned to it.
    async fn create(&self, item: Task) -> Result<TaskId, StorageError>;
    /// Replaces the stored record with the same id.
    async fn update(&self, item: Task) -> Result<(), StorageError>;
    async fn delete(&self, id: &TaskId) -> Result<(), StorageError>;
    /// Live query by owner. Emits the current set right away and again on every change.
    async fn watch(&self, owner: &OwnerId) -> Result<SnapshotFeed, StorageError>;
}
