//! Freeform notes: one document per signed-in owner, or a process-local
//! entry for sessions without one.

mod memory;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::datastore::StorageError;
use crate::model::OwnerId;
pub use memory::MemoryNoteStorage;

const LOCAL_NOTES_KEY: &str = "notes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotesError {
    #[error("loading notes of {owner} failed: {source}")]
    LoadFailed { owner: OwnerId, source: StorageError },
    #[error("saving notes of {owner} failed: {source}")]
    SaveFailed { owner: OwnerId, source: StorageError },
}

#[async_trait::async_trait]
pub trait NoteStorage: Sync + Send + 'static {
    async fn fetch(&self, owner: &OwnerId) -> Result<Option<Note>, StorageError>;
    async fn store(&self, note: Note) -> Result<(), StorageError>;
}

struct NotesState {
    owner: OwnerId,
    content: String,
    local: HashMap<&'static str, String>,
}

pub struct NotesStore<S: NoteStorage> {
    state: Mutex<NotesState>,
    storage: Arc<S>,
}

impl<S> NotesStore<S>
where
    S: NoteStorage,
{
    pub fn new(storage: Arc<S>, owner: OwnerId) -> Self {
        Self {
            state: Mutex::new(NotesState {
                owner,
                content: String::new(),
                local: HashMap::new(),
            }),
            storage,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.state.lock().owner.clone()
    }

    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    /// Leaving a local session discards its notes.
    pub fn switch_owner(&self, owner: OwnerId) {
        let mut state = self.state.lock();
        if state.owner.is_local() {
            state.local.clear();
        }
        state.owner = owner;
        state.content.clear();
    }

    pub async fn load(&self) -> Result<String, NotesError> {
        let owner = self.owner();
        if owner.is_local() {
            let mut state = self.state.lock();
            state.content = state
                .local
                .get(LOCAL_NOTES_KEY)
                .cloned()
                .unwrap_or_default();
            return Ok(state.content.clone());
        }

        let fetched = self.storage.fetch(&owner).await.map_err(|source| {
            error!(owner = %owner, reason = %source, "Error loading notes.");
            NotesError::LoadFailed {
                owner: owner.clone(),
                source,
            }
        })?;
        let mut state = self.state.lock();
        if state.owner == owner {
            if let Some(note) = fetched {
                state.content = note.content;
            }
        }
        Ok(state.content.clone())
    }

    /// Content changes locally right away; signed-in owners also write remotely.
    pub async fn update(&self, content: String) -> Result<(), NotesError> {
        let owner = {
            let mut state = self.state.lock();
            state.content = content.clone();
            if state.owner.is_local() {
                state.local.insert(LOCAL_NOTES_KEY, content);
                return Ok(());
            }
            state.owner.clone()
        };

        let note = Note {
            owner: owner.clone(),
            content,
            updated_at: Utc::now(),
        };
        match self.storage.store(note).await {
            Ok(()) => {
                debug!(owner = %owner, "Notes saved.");
                Ok(())
            }
            Err(source) => {
                error!(owner = %owner, reason = %source, "Error saving notes.");
                Err(NotesError::SaveFailed { owner, source })
            }
        }
    }
}
