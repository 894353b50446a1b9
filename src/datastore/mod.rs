mod datastore;
mod error;
mod filter;
mod list;
mod storage;
mod subscription;

pub use datastore::TaskDataStore;
pub use datastore::TaskStore;
pub use error::DataStoreError;
pub use filter::Filter;
pub use storage::{MemoryTaskStorage, SnapshotFeed, SnapshotSender, StorageError, TaskStorage};
pub use subscription::Subscription;
