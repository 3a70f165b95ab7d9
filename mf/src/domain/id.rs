//! Identifier generation for tasks, subtasks and resources
//!
//! All IDs use the format: `{kind}-{uuid-v7-simple}`
//! Example: `task-0192f4c81d6a7e3b9a0c5d2e4f607182`
//!
//! UUIDv7 carries a millisecond timestamp followed by random bits, so IDs
//! minted within the same millisecond still differ and sort by creation time.

/// Generate an ID for the given record kind
pub fn generate_id(kind: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    format!("{}-{}", kind, uuid.simple())
}

/// Kind prefix for task IDs
pub const TASK: &str = "task";

/// Kind prefix for subtask IDs
pub const SUBTASK: &str = "sub";

/// Kind prefix for resource IDs
pub const RESOURCE: &str = "res";
