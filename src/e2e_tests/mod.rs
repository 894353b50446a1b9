#[cfg(test)]
mod tests {

    use chrono::{Month, NaiveDate, TimeZone, Utc};
    use std::collections::HashSet;
    use std::convert::TryFrom;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::sleep;

    use crate::calendar::{month_grid, tasks_on_date, upcoming_tasks, GRID_CELLS};
    use crate::controller::SessionService;
    use crate::datastore::{
        DataStoreError, Filter, MemoryTaskStorage, TaskDataStore, TaskStore,
    };
    use crate::model::{NewTask, OwnerId, TaskId, TaskPatch};
    use crate::notes::{MemoryNoteStorage, NotesStore};

    fn signed_in() -> OwnerId {
        OwnerId::try_from("user-e2e").unwrap()
    }

    fn remote_store() -> (Arc<MemoryTaskStorage>, Arc<TaskStore<MemoryTaskStorage>>) {
        let storage = Arc::new(MemoryTaskStorage::new());
        let store = Arc::new(TaskStore::new(storage.clone(), signed_in()));
        (storage, store)
    }

    async fn add_task(
        store: Arc<TaskStore<MemoryTaskStorage>>,
        title: String,
    ) -> Result<TaskId, DataStoreError> {
        store.add(NewTask::new(title), None).await.map(|task| task.id)
    }

    #[tokio::test]
    async fn test_e2e_concurrent_adds() {
        let (storage, store) = remote_store();

        let mut handles = vec![];
        for n in 0..5 {
            handles.push(tokio::spawn(add_task(store.clone(), format!("task {}", n))));
        }
        let ids: HashSet<TaskId> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| !id.is_temporary()));
        let listed: HashSet<TaskId> = store.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(storage.items().len(), 5);
        assert_eq!(store.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_e2e_task_lands_on_its_calendar_day() {
        // GIVEN a task written on 2024-03-15
        let (_storage, store) = remote_store();
        let written = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        store
            .add(NewTask::new("Write spec"), Some(written))
            .await
            .unwrap();

        // WHEN the calendar is asked for the surrounding days
        let tasks = store.tasks();
        let on_15 = tasks_on_date(&tasks, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), &Utc);
        let on_16 = tasks_on_date(&tasks, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(), &Utc);

        // THEN
        assert_eq!(on_15.len(), 1);
        assert_eq!(on_15[0].title, "Write spec");
        assert!(on_16.is_empty());
    }

    #[tokio::test]
    async fn test_e2e_upcoming() {
        let (_storage, store) = remote_store();
        for day in [1, 10] {
            let at = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
            store
                .add(NewTask::new(format!("march {}", day)), Some(at))
                .await
                .unwrap();
        }

        let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let upcoming = upcoming_tasks(&store.tasks(), now);

        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].title, "march 10");
    }

    #[test]
    fn test_e2e_february_grid() {
        let grid = month_grid(2024, Month::February).unwrap();

        assert_eq!(grid.days().count(), 29);
        assert_eq!(grid.cells.len(), GRID_CELLS);
    }

    #[tokio::test]
    async fn test_e2e_rejected_create_leaves_no_placeholder() {
        // GIVEN a remote store refusing writes
        let (storage, store) = remote_store();
        storage.set_read_only(true);

        // WHEN
        let err = store.add(NewTask::new("doomed"), None).await.unwrap_err();

        // THEN
        assert!(matches!(err, DataStoreError::CreateFailed { .. }));
        assert!(store.tasks().is_empty());
        assert!(store.tasks().iter().all(|t| !t.id.is_temporary()));
        assert_eq!(store.pending_mutations(), 0);
    }

    #[tokio::test]
    async fn test_e2e_task_lifecycle() {
        let (storage, store) = remote_store();

        let task = store.add(NewTask::new("lifecycle"), None).await.unwrap();
        store
            .update(&task.id, TaskPatch::completed_pomodoros(2))
            .await
            .unwrap();
        store.mark_complete(&task.id).await.unwrap();
        assert_eq!(store.items(&Filter::completed_tasks()).len(), 1);

        store.delete(&task.id).await.unwrap();

        assert!(store.get(&task.id).is_err());
        assert!(storage.items().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_session_follows_sign_in() {
        // GIVEN a signed-out session with one local task
        let storage = Arc::new(MemoryTaskStorage::new());
        let store = Arc::new(TaskStore::new(storage.clone(), OwnerId::local()));
        let notes = Arc::new(NotesStore::new(
            Arc::new(MemoryNoteStorage::new()),
            OwnerId::local(),
        ));
        let (identity, identity_rx) = watch::channel(None);
        let session = SessionService::new(store.clone(), notes, identity_rx).spawn();
        store.add(NewTask::new("offline"), None).await.unwrap();
        assert!(storage.items().is_empty());

        // a task already stored remotely for the user
        let phone = TaskStore::new(storage.clone(), signed_in());
        let remote = phone.add(NewTask::new("from phone"), None).await.unwrap();

        // WHEN the user signs in
        identity.send(Some("user-e2e".to_string())).unwrap();
        sleep(Duration::from_millis(100)).await;

        // THEN the local list is replaced by the remote one
        let titles: Vec<String> = store.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["from phone".to_string()]);
        assert_eq!(store.get(&remote.id).unwrap().owner, signed_in());

        drop(identity);
        session.await.unwrap();
        assert_eq!(storage.watcher_count(), 0);
    }
}
