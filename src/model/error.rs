use super::mutation::MutationState;
use thiserror::Error;

// Task and mutation validation errors
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ModelError {
    #[error("Task title must not be empty.")]
    EmptyTitle,
    #[error("Target pomodoros must be positive, got {0}.")]
    InvalidTargetPomodoros(u32),
    #[error("Unable to transition mutation: from {0:?} to {1:?}.")]
    UnableTransitionState(MutationState, MutationState),
}
