use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

use super::super::TaskStorage;
use super::error::StorageError;
use super::feed::{SnapshotFeed, SnapshotSender};
use crate::model::{OwnerId, Task, TaskId};

struct Watcher {
    owner: OwnerId,
    tx: SnapshotSender,
}

/// In-process document store with live queries. Stands in for the hosted
/// store in tests and in the demo binary.
pub struct MemoryTaskStorage {
    tasks: Mutex<HashMap<TaskId, Task>>,
    watchers: Mutex<Vec<Watcher>>,
    read_only: AtomicBool,
}

impl Default for MemoryTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTaskStorage {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            watchers: Mutex::new(Vec::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// While set, every write is rejected with [`StorageError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    pub fn items(&self) -> Vec<Task> {
        self.tasks.lock().values().cloned().collect()
    }

    /// Number of live queries still held by a receiver.
    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| !w.tx.is_closed());
        watchers.len()
    }

    /// Fails every open live query, as a dropped connection would.
    pub fn close_feeds(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for watcher in watchers {
            let _ = watcher.tx.send(Err(StorageError::FeedClosed));
        }
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::Acquire) {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }

    /// Sends `owner`'s current set to its watchers. Called with the `tasks`
    /// lock held so snapshots leave in write order; `watchers` is always
    /// locked after `tasks`.
    fn notify(&self, tasks: &HashMap<TaskId, Task>, owner: &OwnerId) {
        let snapshot = snapshot(tasks, owner);
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| {
            if w.owner != *owner {
                return !w.tx.is_closed();
            }
            w.tx.send(Ok(snapshot.clone())).is_ok()
        });
    }
}

fn snapshot(tasks: &HashMap<TaskId, Task>, owner: &OwnerId) -> Vec<Task> {
    tasks
        .values()
        .filter(|t| t.owner == *owner)
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl TaskStorage for MemoryTaskStorage {
    async fn create(&self, mut item: Task) -> Result<TaskId, StorageError> {
        self.check_writable()?;
        let mut tasks = self.tasks.lock();
        if item.id.is_temporary() {
            item.id = TaskId::new(Uuid::new_v4().to_string());
        }
        if tasks.contains_key(&item.id) {
            return Err(StorageError::Conflict(item.id));
        }
        tasks.insert(item.id.clone(), item.clone());
        debug!(id = %item.id, owner = %item.owner, "task created");
        self.notify(&tasks, &item.owner);
        Ok(item.id)
    }

    async fn update(&self, item: Task) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut tasks = self.tasks.lock();
        match tasks.get_mut(&item.id) {
            Some(task) => *task = item.clone(),
            None => return Err(StorageError::NotFound(item.id)),
        }
        self.notify(&tasks, &item.owner);
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut tasks = self.tasks.lock();
        match tasks.remove(id) {
            Some(task) => {
                self.notify(&tasks, &task.owner);
                Ok(())
            }
            None => Err(StorageError::NotFound(id.clone())),
        }
    }

    async fn watch(&self, owner: &OwnerId) -> Result<SnapshotFeed, StorageError> {
        let (tx, feed) = SnapshotFeed::channel();
        let tasks = self.tasks.lock();
        let _ = tx.send(Ok(snapshot(&tasks, owner)));
        self.watchers.lock().push(Watcher {
            owner: owner.clone(),
            tx,
        });
        Ok(feed)
    }
}
