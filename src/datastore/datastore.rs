use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::DataStoreError;
use super::filter::Filter;
use super::list::TaskList;
use super::storage::TaskStorage;
use super::subscription::Subscription;
use crate::model::task::DEFAULT_TARGET_POMODOROS;
use crate::model::{
    Compensation, NewTask, OwnerId, PendingMutation, Task, TaskId, TaskPatch, TaskStatus,
};

#[async_trait::async_trait]
pub trait TaskDataStore {
    async fn add(
        &self,
        draft: NewTask,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Task, DataStoreError>;
    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, DataStoreError>;
    async fn delete(&self, id: &TaskId) -> Result<(), DataStoreError>;
    async fn mark_complete(&self, id: &TaskId) -> Result<Task, DataStoreError>;
    async fn record_pomodoro(&self, id: &TaskId) -> Result<Task, DataStoreError>;
    fn tasks(&self) -> Vec<Task>;
    fn items(&self, filter: &Filter) -> Vec<Task>;
    fn tags(&self) -> BTreeSet<String>;
    fn get(&self, id: &TaskId) -> Result<Task, DataStoreError>;
}

/// Single source of truth for the current owner's tasks.
///
/// Mutations land in the in-memory list first and are then written to the
/// remote storage. A rejected write is undone and reported; nothing is retried.
/// For the local owner the remote storage is never touched.
pub struct TaskStore<S: TaskStorage> {
    list: Arc<Mutex<TaskList>>,
    ledger: Mutex<HashMap<u64, PendingMutation>>,
    next_seq: AtomicU64,
    default_target_pomodoros: u32,
    storage: Arc<S>,
}

impl<S> TaskStore<S>
where
    S: TaskStorage,
{
    pub fn new(storage: Arc<S>, owner: OwnerId) -> Self {
        Self {
            list: Arc::new(Mutex::new(TaskList::new(owner))),
            ledger: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            default_target_pomodoros: DEFAULT_TARGET_POMODOROS,
            storage,
        }
    }

    /// Target used for drafts that do not set one. Zero is ignored.
    pub fn with_default_target_pomodoros(mut self, target: u32) -> Self {
        if target > 0 {
            self.default_target_pomodoros = target;
        }
        self
    }

    pub fn owner(&self) -> OwnerId {
        self.list.lock().owner().clone()
    }

    /// Switches to another owner. The list and every pending mutation of the
    /// previous owner are forgotten.
    pub fn switch_owner(&self, owner: OwnerId) {
        let previous = {
            let mut list = self.list.lock();
            let previous = list.owner().clone();
            list.reset(owner.clone());
            previous
        };
        let dropped = {
            let mut ledger = self.ledger.lock();
            let dropped = ledger.len();
            ledger.clear();
            dropped
        };
        info!(from = %previous, to = %owner, pending_dropped = dropped, "Owner switched.");
    }

    /// Opens the live feed of `owner`'s tasks, switching to that owner first
    /// if needed.
    pub async fn subscribe(&self, owner: OwnerId) -> Result<Subscription, DataStoreError> {
        if self.owner() != owner {
            self.switch_owner(owner.clone());
        }
        if owner.is_local() {
            debug!("Local session, subscription is inert.");
            return Ok(Subscription::inert(owner, self.list.clone()));
        }

        let feed = self.storage.watch(&owner).await.map_err(|source| {
            error!(owner = %owner, reason = %source, "Unable to subscribe to tasks.");
            DataStoreError::SubscriptionFailed {
                owner: owner.clone(),
                source,
            }
        })?;
        info!(owner = %owner, "Subscribed to tasks.");
        Ok(Subscription::remote(owner, feed, self.list.clone()))
    }

    /// Number of remote writes not yet confirmed or rejected.
    pub fn pending_mutations(&self) -> usize {
        self.ledger.lock().len()
    }

    fn begin(&self, target: TaskId, generation: u64, compensation: Compensation) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.ledger.lock().insert(
            seq,
            PendingMutation::new(seq, target, generation, compensation),
        );
        seq
    }

    fn confirm(&self, seq: u64) {
        let entry = self.ledger.lock().remove(&seq);
        if let Some(mut mutation) = entry {
            if let Err(err) = mutation.confirm() {
                warn!(seq, reason = %err, "Unable to confirm mutation.");
            }
        }
    }

    // A mutation missing from the ledger belonged to a previous owner.
    fn fail(&self, seq: u64) {
        let entry = self.ledger.lock().remove(&seq);
        let mut mutation = match entry {
            Some(mutation) => mutation,
            None => return,
        };
        match mutation.fail() {
            Ok(compensation) => {
                let mut list = self.list.lock();
                if list.generation() != mutation.generation {
                    // a newer snapshot already replaced the optimistic change
                    debug!(seq, target = %mutation.target, "Skipping compensation of failed mutation.");
                    return;
                }
                debug!(seq, target = %mutation.target, "Compensating failed mutation.");
                list.compensate(compensation);
            }
            Err(err) => warn!(seq, reason = %err, "Unable to fail mutation."),
        }
    }

    /// Applies the patch built from the current record, under the same lock
    /// that reads it.
    async fn update_with<F>(&self, id: &TaskId, build: F) -> Result<Task, DataStoreError>
    where
        F: FnOnce(&Task) -> TaskPatch + Send,
    {
        let now = Utc::now();
        let (previous, updated, owner, generation) = {
            let mut list = self.list.lock();
            let owner = list.owner().clone();
            let generation = list.generation();
            let task = list
                .get_mut(id)
                .ok_or_else(|| DataStoreError::NotFound(id.clone()))?;
            let patch = build(&*task);
            if patch.is_empty() {
                debug!(id = %id, "Empty patch, nothing to write.");
                return Ok(task.clone());
            }
            let previous = task.clone();
            task.apply(&patch, now)?;
            (previous, task.clone(), owner, generation)
        };

        if owner.is_local() {
            return Ok(updated);
        }
        self.write_update(previous, updated, generation).await
    }

    async fn write_update(
        &self,
        previous: Task,
        updated: Task,
        generation: u64,
    ) -> Result<Task, DataStoreError> {
        let seq = self.begin(
            updated.id.clone(),
            generation,
            Compensation::Restore(previous),
        );
        match self.storage.update(updated.clone()).await {
            Ok(()) => {
                self.confirm(seq);
                Ok(updated)
            }
            Err(source) => {
                error!(id = %updated.id, reason = %source, "Failed to update the task.");
                self.fail(seq);
                Err(DataStoreError::UpdateFailed {
                    task: Box::new(updated),
                    source,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl<S> TaskDataStore for TaskStore<S>
where
    S: TaskStorage,
{
    async fn add(
        &self,
        mut draft: NewTask,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Task, DataStoreError> {
        let now = Utc::now();
        draft
            .target_pomodoros
            .get_or_insert(self.default_target_pomodoros);
        let (task, generation) = {
            let mut list = self.list.lock();
            let task = Task::new(
                TaskId::temporary(),
                list.owner().clone(),
                draft,
                created_at.unwrap_or(now),
                now,
            )?;
            list.insert(task.clone());
            (task, list.generation())
        };
        let owner = task.owner.clone();

        if owner.is_local() {
            debug!(id = %task.id, "Task added to the local session.");
            return Ok(task);
        }

        let temporary = task.id.clone();
        let seq = self.begin(
            temporary.clone(),
            generation,
            Compensation::RemovePlaceholder(temporary.clone()),
        );
        match self.storage.create(task.clone()).await {
            Ok(assigned) => {
                self.confirm(seq);
                self.list.lock().reconcile(&temporary, &assigned);
                info!(id = %assigned, "Task created.");
                let mut created = task;
                created.id = assigned;
                Ok(created)
            }
            Err(source) => {
                error!(title = %task.title, reason = %source, "Failed to create the task.");
                self.fail(seq);
                Err(DataStoreError::CreateFailed {
                    task: Box::new(task),
                    source,
                })
            }
        }
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, DataStoreError> {
        self.update_with(id, move |_| patch).await
    }

    async fn delete(&self, id: &TaskId) -> Result<(), DataStoreError> {
        let (removed, owner, generation) = {
            let mut list = self.list.lock();
            let owner = list.owner().clone();
            let generation = list.generation();
            let removed = list
                .remove(id)
                .ok_or_else(|| DataStoreError::NotFound(id.clone()))?;
            (removed, owner, generation)
        };

        if owner.is_local() {
            return Ok(());
        }

        let seq = self.begin(id.clone(), generation, Compensation::Restore(removed));
        match self.storage.delete(id).await {
            Ok(()) => {
                self.confirm(seq);
                info!(id = %id, "Task deleted.");
                Ok(())
            }
            Err(source) => {
                error!(id = %id, reason = %source, "Failed to delete the task.");
                self.fail(seq);
                Err(DataStoreError::DeleteFailed {
                    id: id.clone(),
                    source,
                })
            }
        }
    }

    async fn mark_complete(&self, id: &TaskId) -> Result<Task, DataStoreError> {
        self.update(id, TaskPatch::status(TaskStatus::Completed))
            .await
    }

    async fn record_pomodoro(&self, id: &TaskId) -> Result<Task, DataStoreError> {
        self.update_with(id, |task| {
            TaskPatch::completed_pomodoros(task.completed_pomodoros.saturating_add(1))
        })
        .await
    }

    fn tasks(&self) -> Vec<Task> {
        self.list.lock().tasks().to_vec()
    }

    fn items(&self, filter: &Filter) -> Vec<Task> {
        let list = self.list.lock();
        list.tasks()
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    fn tags(&self) -> BTreeSet<String> {
        let list = self.list.lock();
        list.tasks()
            .iter()
            .flat_map(|task| task.tags.iter().cloned())
            .collect()
    }

    fn get(&self, id: &TaskId) -> Result<Task, DataStoreError> {
        match self.list.lock().get(id) {
            Some(task) => Ok(task.clone()),
            None => Err(DataStoreError::NotFound(id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use std::convert::TryFrom;
    use tokio::sync::Notify;

    use super::*;
    use crate::datastore::storage::{MemoryTaskStorage, SnapshotFeed, StorageError};
    use crate::model::task::testdata::at;
    use crate::model::{Category, ModelError, Priority};

    fn user() -> OwnerId {
        OwnerId::try_from("user-1").unwrap()
    }

    fn remote_store() -> (Arc<MemoryTaskStorage>, TaskStore<MemoryTaskStorage>) {
        let storage = Arc::new(MemoryTaskStorage::new());
        let ds = TaskStore::new(storage.clone(), user());
        (storage, ds)
    }

    /// Holds updates and deletes until the gate opens. Updates are then
    /// rejected; deletes go through to the inner storage.
    struct GatedStorage {
        inner: Arc<MemoryTaskStorage>,
        gate: Notify,
    }

    #[async_trait::async_trait]
    impl TaskStorage for GatedStorage {
        async fn create(&self, item: Task) -> Result<TaskId, StorageError> {
            self.inner.create(item).await
        }

        async fn update(&self, _item: Task) -> Result<(), StorageError> {
            self.gate.notified().await;
            Err(StorageError::ReadOnly)
        }

        async fn delete(&self, id: &TaskId) -> Result<(), StorageError> {
            self.gate.notified().await;
            self.inner.delete(id).await
        }

        async fn watch(&self, owner: &OwnerId) -> Result<SnapshotFeed, StorageError> {
            self.inner.watch(owner).await
        }
    }

    fn gated_store() -> (
        Arc<MemoryTaskStorage>,
        Arc<GatedStorage>,
        Arc<TaskStore<GatedStorage>>,
    ) {
        let memory = Arc::new(MemoryTaskStorage::new());
        let gated = Arc::new(GatedStorage {
            inner: memory.clone(),
            gate: Notify::new(),
        });
        let ds = Arc::new(TaskStore::new(gated.clone(), user()));
        (memory, gated, ds)
    }

    async fn wait_for_pending<S: TaskStorage>(ds: &TaskStore<S>) {
        while ds.pending_mutations() == 0 {
            tokio::task::yield_now().await;
        }
    }

    fn write_spec() -> NewTask {
        NewTask::new("Write spec")
            .with_category(Category::Main)
            .with_priority(Priority::High)
    }

    #[tokio::test]
    async fn test_local_session_never_touches_storage() {
        // GIVEN
        let storage = Arc::new(MemoryTaskStorage::new());
        storage.set_read_only(true);
        let ds = TaskStore::new(storage.clone(), OwnerId::local());

        // WHEN
        let task = ds.add(write_spec(), None).await.unwrap();
        ds.mark_complete(&task.id).await.unwrap();
        let second = ds.add(NewTask::new("Stretch"), None).await.unwrap();
        ds.delete(&second.id).await.unwrap();

        // THEN
        assert!(task.id.is_temporary());
        assert_eq!(task.owner, OwnerId::local());
        assert!(storage.items().is_empty());
        let tasks = ds.tasks();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].is_completed());
        assert_eq!(ds.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_add_reconciles_assigned_id() {
        let (storage, ds) = remote_store();

        let task = ds
            .add(write_spec(), Some(at(2024, 3, 15, 9)))
            .await
            .unwrap();

        assert!(!task.id.is_temporary());
        assert_eq!(task.created_at, at(2024, 3, 15, 9));
        let tasks = ds.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task.id);
        assert_eq!(storage.items()[0].id, task.id);
        assert_eq!(ds.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_rejected_create_drops_placeholder() {
        // GIVEN
        let (storage, ds) = remote_store();
        storage.set_read_only(true);

        // WHEN
        let err = ds.add(write_spec(), None).await.unwrap_err();

        // THEN
        match err {
            DataStoreError::CreateFailed { task, source } => {
                assert_eq!(task.title, "Write spec");
                assert!(task.id.is_temporary());
                assert_eq!(source, StorageError::ReadOnly);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(ds.tasks().iter().all(|t| !t.id.is_temporary()));
        assert!(ds.tasks().is_empty());
        assert_eq!(ds.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_rejected_update_is_reverted() {
        // GIVEN
        let (storage, ds) = remote_store();
        let task = ds.add(write_spec(), None).await.unwrap();
        storage.set_read_only(true);

        // WHEN
        let patch = TaskPatch {
            title: Some("Rewrite spec".to_string()),
            ..TaskPatch::default()
        };
        let err = ds.update(&task.id, patch).await.unwrap_err();

        // THEN
        assert!(matches!(err, DataStoreError::UpdateFailed { .. }));
        assert_eq!(ds.get(&task.id).unwrap(), task);
    }

    #[tokio::test]
    async fn test_rejected_delete_is_reinserted() {
        let (storage, ds) = remote_store();
        let older = ds
            .add(NewTask::new("older"), Some(at(2024, 3, 1, 9)))
            .await
            .unwrap();
        let newer = ds
            .add(NewTask::new("newer"), Some(at(2024, 3, 2, 9)))
            .await
            .unwrap();
        storage.set_read_only(true);

        let err = ds.delete(&older.id).await.unwrap_err();

        assert_eq!(
            err,
            DataStoreError::DeleteFailed {
                id: older.id.clone(),
                source: StorageError::ReadOnly
            }
        );
        let ids: Vec<TaskId> = ds.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_add_update_delete_round_trip() {
        let (storage, ds) = remote_store();

        let task = ds.add(write_spec(), None).await.unwrap();
        let updated = ds
            .update(&task.id, TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap();
        assert!(updated.updated_at >= task.updated_at);
        assert!(updated.updated_at >= updated.created_at);
        ds.delete(&task.id).await.unwrap();

        assert!(ds.get(&task.id).is_err());
        assert!(ds.tasks().iter().all(|t| t.id != task.id));
        assert!(storage.items().is_empty());
    }

    #[tokio::test]
    async fn test_completion_tracks_completed_at() {
        let (_storage, ds) = remote_store();
        let task = ds.add(write_spec(), None).await.unwrap();

        let done = ds.mark_complete(&task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());

        let reopened = ds
            .update(&task.id, TaskPatch::status(TaskStatus::Pending))
            .await
            .unwrap();
        assert_eq!(reopened.completed_at, None);
    }

    #[tokio::test]
    async fn test_record_pomodoro_is_not_clamped() {
        let (storage, ds) = remote_store();
        let task = ds.add(write_spec(), None).await.unwrap();
        assert_eq!(task.target_pomodoros, 1);

        ds.record_pomodoro(&task.id).await.unwrap();
        let task = ds.record_pomodoro(&task.id).await.unwrap();

        assert_eq!(task.completed_pomodoros, 2);
        assert_eq!(storage.items()[0].completed_pomodoros, 2);
    }

    #[tokio::test]
    async fn test_default_target_pomodoros() {
        let storage = Arc::new(MemoryTaskStorage::new());
        let ds = TaskStore::new(storage, OwnerId::local()).with_default_target_pomodoros(4);

        let defaulted = ds.add(NewTask::new("a"), None).await.unwrap();
        let explicit = NewTask {
            target_pomodoros: Some(2),
            ..NewTask::new("b")
        };
        let explicit = ds.add(explicit, None).await.unwrap();

        assert_eq!(defaulted.target_pomodoros, 4);
        assert_eq!(explicit.target_pomodoros, 2);
    }

    #[tokio::test]
    async fn test_invalid_input_and_missing_ids() {
        let (_storage, ds) = remote_store();

        assert_eq!(
            ds.add(NewTask::new(""), None).await.unwrap_err(),
            DataStoreError::Invalid(ModelError::EmptyTitle)
        );
        let missing = TaskId::new("missing");
        assert_eq!(
            ds.mark_complete(&missing).await.unwrap_err(),
            DataStoreError::NotFound(missing.clone())
        );
        assert_eq!(
            ds.delete(&missing).await.unwrap_err(),
            DataStoreError::NotFound(missing)
        );
        assert!(ds.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_items_filter() {
        let ds = TaskStore::new(Arc::new(MemoryTaskStorage::new()), OwnerId::local());
        let a = ds.add(NewTask::new("a"), None).await.unwrap();
        ds.add(NewTask::new("b"), None).await.unwrap();
        ds.mark_complete(&a.id).await.unwrap();

        let done = ds.items(&Filter::completed_tasks());
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, a.id);
        assert_eq!(ds.items(&Filter::pending_tasks()).len(), 1);
        assert_eq!(ds.items(&Filter::default()).len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_replaces_list_newest_first() {
        // GIVEN tasks written by another device
        let storage = Arc::new(MemoryTaskStorage::new());
        let other_device = TaskStore::new(storage.clone(), user());
        other_device
            .add(NewTask::new("first"), Some(at(2024, 3, 1, 9)))
            .await
            .unwrap();
        other_device
            .add(NewTask::new("second"), Some(at(2024, 3, 10, 9)))
            .await
            .unwrap();

        let ds = TaskStore::new(storage.clone(), OwnerId::local());

        // WHEN
        let mut subscription = ds.subscribe(user()).await.unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();

        // THEN
        assert_eq!(ds.owner(), user());
        let titles: Vec<String> = snapshot.iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(ds.tasks(), snapshot);

        // WHEN the other device deletes
        let first = snapshot[1].id.clone();
        other_device.delete(&first).await.unwrap();

        // THEN
        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(ds.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_releases_feed() {
        let (storage, ds) = remote_store();
        let mut subscription = ds.subscribe(user()).await.unwrap();
        assert!(subscription.is_active());
        assert_eq!(storage.watcher_count(), 1);

        subscription.unsubscribe();
        subscription.unsubscribe();

        assert!(!subscription.is_active());
        assert_eq!(storage.watcher_count(), 0);
        assert!(subscription.next().await.is_none());

        // restartable
        let again = ds.subscribe(user()).await.unwrap();
        assert_eq!(storage.watcher_count(), 1);
        drop(again);
        assert_eq!(storage.watcher_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_failure_is_reported() {
        let (storage, ds) = remote_store();
        let mut subscription = ds.subscribe(user()).await.unwrap();
        let _ = subscription.next().await;

        storage.close_feeds();

        assert_eq!(
            subscription.next().await.unwrap().unwrap_err(),
            DataStoreError::SubscriptionFailed {
                owner: user(),
                source: StorageError::FeedClosed
            }
        );
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_subscription_stops_after_owner_switch() {
        let (storage, ds) = remote_store();
        ds.add(NewTask::new("mine"), None).await.unwrap();
        let mut subscription = ds.subscribe(user()).await.unwrap();

        ds.switch_owner(OwnerId::local());

        assert!(subscription.next().await.is_none());
        assert!(ds.tasks().is_empty());
        assert_eq!(storage.watcher_count(), 0);
    }

    #[tokio::test]
    async fn test_local_subscription_is_inert() {
        let (_storage, ds) = remote_store();
        ds.add(NewTask::new("mine"), None).await.unwrap();

        let mut subscription = ds.subscribe(OwnerId::local()).await.unwrap();

        assert!(!subscription.is_active());
        assert!(subscription.next().await.is_none());
        assert!(ds.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_newer_snapshot() {
        // GIVEN a subscribed store whose remote updates wait on a gate
        let (memory, gated, ds) = gated_store();
        let mut subscription = ds.subscribe(user()).await.unwrap();
        subscription.next().await.unwrap().unwrap();
        let task = ds.add(NewTask::new("v0"), None).await.unwrap();
        subscription.next().await.unwrap().unwrap();

        // WHEN an edit is in flight
        let pending = tokio::spawn({
            let ds = ds.clone();
            let id = task.id.clone();
            async move {
                let patch = TaskPatch {
                    title: Some("v1".to_string()),
                    ..TaskPatch::default()
                };
                ds.update(&id, patch).await
            }
        });
        wait_for_pending(&ds).await;
        assert_eq!(ds.get(&task.id).unwrap().title, "v1");

        // AND another device stores a newer version
        let mut newer = task.clone();
        newer.title = "v2".to_string();
        memory.update(newer).await.unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot[0].title, "v2");

        // AND the edit is rejected afterwards
        gated.gate.notify_one();
        let result = pending.await.unwrap();

        // THEN the snapshot stands
        assert!(matches!(result, Err(DataStoreError::UpdateFailed { .. })));
        assert_eq!(ds.get(&task.id).unwrap().title, "v2");
        assert_eq!(ds.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_revive_remotely_deleted_task() {
        // GIVEN
        let (memory, gated, ds) = gated_store();
        let mut subscription = ds.subscribe(user()).await.unwrap();
        subscription.next().await.unwrap().unwrap();
        let task = ds.add(NewTask::new("gone"), None).await.unwrap();
        subscription.next().await.unwrap().unwrap();

        // WHEN a delete is in flight while another device deletes first
        let pending = tokio::spawn({
            let ds = ds.clone();
            let id = task.id.clone();
            async move { ds.delete(&id).await }
        });
        wait_for_pending(&ds).await;
        memory.delete(&task.id).await.unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();
        assert!(snapshot.is_empty());
        gated.gate.notify_one();

        // THEN
        assert_eq!(
            pending.await.unwrap(),
            Err(DataStoreError::DeleteFailed {
                id: task.id.clone(),
                source: StorageError::NotFound(task.id.clone())
            })
        );
        assert!(ds.tasks().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pomodoros_are_all_counted() {
        let (_storage, ds) = remote_store();
        let ds = Arc::new(ds);
        let task = ds.add(write_spec(), None).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ds = ds.clone();
                let id = task.id.clone();
                tokio::spawn(async move { ds.record_pomodoro(&id).await })
            })
            .collect();
        for joined in futures::future::join_all(handles).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(ds.get(&task.id).unwrap().completed_pomodoros, 16);
    }

    #[tokio::test]
    async fn test_add_takes_owner_of_current_list() {
        let (storage, ds) = remote_store();
        let other = OwnerId::try_from("user-2").unwrap();
        ds.switch_owner(other.clone());

        let task = ds.add(NewTask::new("after switch"), None).await.unwrap();

        assert_eq!(task.owner, other);
        assert!(ds.tasks().iter().all(|t| t.owner == other));
        assert_eq!(storage.items()[0].owner, other);
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let (storage, ds) = remote_store();
        let task = ds.add(write_spec(), None).await.unwrap();
        storage.set_read_only(true);

        let same = ds.update(&task.id, TaskPatch::default()).await.unwrap();

        assert_eq!(same, task);
        assert_eq!(ds.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_tags_across_tasks() {
        let ds = TaskStore::new(Arc::new(MemoryTaskStorage::new()), OwnerId::local());
        ds.add(NewTask::new("a").with_tag("work").with_tag("deep"), None)
            .await
            .unwrap();
        ds.add(NewTask::new("b").with_tag("work"), None)
            .await
            .unwrap();
        ds.add(NewTask::new("c"), None).await.unwrap();

        let tags: Vec<String> = ds.tags().into_iter().collect();
        assert_eq!(tags, vec!["deep", "work"]);
    }
}
