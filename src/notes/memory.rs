use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Note, NoteStorage};
use crate::datastore::StorageError;
use crate::model::OwnerId;

/// One note document per owner, kept in process.
#[derive(Default)]
pub struct MemoryNoteStorage {
    notes: Mutex<HashMap<OwnerId, Note>>,
    read_only: AtomicBool,
}

impl MemoryNoteStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }
}

#[async_trait::async_trait]
impl NoteStorage for MemoryNoteStorage {
    async fn fetch(&self, owner: &OwnerId) -> Result<Option<Note>, StorageError> {
        Ok(self.notes.lock().get(owner).cloned())
    }

    async fn store(&self, note: Note) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::Acquire) {
            return Err(StorageError::ReadOnly);
        }
        self.notes.lock().insert(note.owner.clone(), note);
        Ok(())
    }
}
