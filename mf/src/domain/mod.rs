//! Domain types for MindFlow
//!
//! Core domain types: Task with its owned Subtasks and ResourceItems,
//! plus the Priority and Status enums the views bucket by.

pub mod id;
mod priority;
mod status;
mod task;

pub use id::generate_id;
pub use priority::Priority;
pub use status::Status;
pub use task::{
    DEFAULT_CATEGORY, NewResource, NewTask, ResourceItem, ResourceKind, Subtask, SubtaskProgress, Task, TaskPatch,
};
