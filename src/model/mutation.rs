//! Bookkeeping for optimistic mutations waiting on the remote store.

use super::error::ModelError;
use super::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Confirmed,
    Failed,
}

/// What undoes an optimistic change once the remote write is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Drop the placeholder inserted by a create.
    RemovePlaceholder(TaskId),
    /// Put back the record as it was before an update or delete.
    Restore(Task),
}

/// `generation` is the list generation the optimistic change was applied to.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub seq: u64,
    pub target: TaskId,
    pub generation: u64,
    state: MutationState,
    compensation: Compensation,
}

impl PendingMutation {
    pub fn new(seq: u64, target: TaskId, generation: u64, compensation: Compensation) -> Self {
        Self {
            seq,
            target,
            generation,
            state: MutationState::Pending,
            compensation,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn is_final_state(&self) -> bool {
        self.state != MutationState::Pending
    }

    fn transition(&mut self, new_state: MutationState) -> Result<(), ModelError> {
        if self.is_final_state() {
            return Err(ModelError::UnableTransitionState(self.state, new_state));
        }
        self.state = new_state;
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), ModelError> {
        self.transition(MutationState::Confirmed)
    }

    /// Marks the mutation failed and hands out the patch that undoes it.
    pub fn fail(&mut self) -> Result<Compensation, ModelError> {
        self.transition(MutationState::Failed)?;
        Ok(self.compensation.clone())
    }
}
