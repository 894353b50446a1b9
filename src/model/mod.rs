pub mod error;
pub mod mutation;
pub mod owner;
pub mod patch;
pub mod task;

pub use error::ModelError;
pub use mutation::{Compensation, MutationState, PendingMutation};
pub use owner::{InvalidOwnerId, OwnerId, LOCAL_OWNER};
pub use patch::{NewTask, TaskPatch};
pub use task::{sort_newest_first, Category, Priority, Status as TaskStatus, Task, TaskId};
