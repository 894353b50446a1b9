use crate::model::{sort_newest_first, Compensation, OwnerId, Task, TaskId};

/// The in-memory task list of one owner, kept newest first.
///
/// `generation` moves every time the list is replaced wholesale.
#[derive(Debug, Default)]
pub(crate) struct TaskList {
    owner: OwnerId,
    tasks: Vec<Task>,
    generation: u64,
}

impl TaskList {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            tasks: Vec::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == *id)
    }

    /// Switches owner and forgets the previous owner's tasks.
    pub fn reset(&mut self, owner: OwnerId) {
        self.owner = owner;
        self.tasks.clear();
        self.generation += 1;
    }

    pub fn insert(&mut self, task: Task) {
        self.tasks.insert(0, task);
        sort_newest_first(&mut self.tasks);
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == *id)?;
        Some(self.tasks.remove(index))
    }

    /// Replaces the record with the same id, or re-inserts it when gone.
    pub fn restore(&mut self, task: Task) {
        match self.get_mut(&task.id) {
            Some(current) => *current = task,
            None => self.insert(task),
        }
    }

    pub fn compensate(&mut self, compensation: Compensation) {
        match compensation {
            Compensation::RemovePlaceholder(id) => {
                self.remove(&id);
            }
            Compensation::Restore(task) => self.restore(task),
        }
    }

    /// Swaps a placeholder id for the store-assigned one. When a snapshot
    /// already delivered the stored record, the placeholder is dropped.
    pub fn reconcile(&mut self, temporary: &TaskId, assigned: &TaskId) {
        if self.get(assigned).is_some() {
            self.remove(temporary);
            return;
        }
        if let Some(task) = self.get_mut(temporary) {
            task.id = assigned.clone();
        }
    }

    /// Installs a snapshot if it belongs to the current owner.
    pub fn replace_for(&mut self, owner: &OwnerId, mut snapshot: Vec<Task>) -> bool {
        if self.owner != *owner {
            return false;
        }
        sort_newest_first(&mut snapshot);
        self.tasks = snapshot;
        self.generation += 1;
        true
    }
}
