//! Store manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::{CategoryGroup, StatusColumn};
use crate::domain::{NewResource, NewTask, Status, Task, TaskPatch};

/// Errors from store operations
///
/// Absent ids are never errors; the only failure is losing the actor.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Channel error")]
    ChannelError,
}

/// Response from store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// Reply carrying the affected task, or None when nothing changed
pub type TaskReply = oneshot::Sender<Option<Task>>;

/// Commands sent to the StoreManager actor
#[derive(Debug)]
pub enum StoreCommand {
    // Queries
    List {
        reply: oneshot::Sender<Vec<Task>>,
    },
    Get {
        id: String,
        reply: TaskReply,
    },
    GroupByCategory {
        reply: oneshot::Sender<Vec<CategoryGroup>>,
    },
    GroupByStatus {
        reply: oneshot::Sender<Vec<StatusColumn>>,
    },

    // Task operations
    Append {
        tasks: Vec<Task>,
        reply: oneshot::Sender<Vec<Task>>,
    },
    Create {
        new: NewTask,
        reply: TaskReply,
    },
    Update {
        id: String,
        patch: TaskPatch,
        reply: TaskReply,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    CycleStatus {
        id: String,
        reply: TaskReply,
    },
    MoveToStatus {
        id: String,
        status: Status,
        reply: TaskReply,
    },

    // Subtask operations
    AddSubtask {
        task_id: String,
        text: String,
        reply: TaskReply,
    },
    ToggleSubtask {
        task_id: String,
        subtask_id: String,
        reply: TaskReply,
    },
    DeleteSubtask {
        task_id: String,
        subtask_id: String,
        reply: TaskReply,
    },

    // Resource operations
    AddResource {
        task_id: String,
        resource: NewResource,
        reply: TaskReply,
    },
    DeleteResource {
        task_id: String,
        resource_id: String,
        reply: TaskReply,
    },

    // Shutdown
    Shutdown,
}
