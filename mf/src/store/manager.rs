//! StoreManager - actor that owns the TaskStore
//!
//! Every mutation travels through one channel and is applied to completion
//! before the next one is read, so callers on any task see a serialized
//! history of the session's store.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StoreCommand, StoreError, StoreResponse};
use super::{CategoryGroup, StatusColumn, TaskStore};
use crate::domain::{NewResource, NewTask, Status, Task, TaskPatch};

/// Handle to send commands to the StoreManager
#[derive(Clone)]
pub struct StoreManager {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreManager {
    /// Spawn a new StoreManager actor with an empty store
    pub fn spawn() -> Self {
        Self::spawn_with(TaskStore::new())
    }

    /// Spawn a StoreManager actor around an existing store
    pub fn spawn_with(store: TaskStore) -> Self {
        debug!(task_count = store.len(), "spawn_with: called");
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(actor_loop(store, rx));

        info!("StoreManager spawned");

        Self { tx }
    }

    /// Send a command and wait for its reply
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> StoreCommand) -> StoreResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)
    }

    // === Queries ===

    /// Snapshot of all tasks in store order
    pub async fn list(&self) -> StoreResponse<Vec<Task>> {
        debug!("list: called");
        self.request(|reply| StoreCommand::List { reply }).await
    }

    /// Look up a task by id (the "selected task" read)
    pub async fn get(&self, id: &str) -> StoreResponse<Option<Task>> {
        debug!(%id, "get: called");
        let id = id.to_string();
        self.request(|reply| StoreCommand::Get { id, reply }).await
    }

    pub async fn group_by_category(&self) -> StoreResponse<Vec<CategoryGroup>> {
        debug!("group_by_category: called");
        self.request(|reply| StoreCommand::GroupByCategory { reply }).await
    }

    pub async fn group_by_status(&self) -> StoreResponse<Vec<StatusColumn>> {
        debug!("group_by_status: called");
        self.request(|reply| StoreCommand::GroupByStatus { reply }).await
    }

    // === Task operations ===

    /// Append tasks; returns them as stored
    pub async fn append(&self, tasks: Vec<Task>) -> StoreResponse<Vec<Task>> {
        debug!(count = tasks.len(), "append: called");
        self.request(|reply| StoreCommand::Append { tasks, reply }).await
    }

    pub async fn create(&self, new: NewTask) -> StoreResponse<Option<Task>> {
        debug!(title = %new.title, "create: called");
        self.request(|reply| StoreCommand::Create { new, reply }).await
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> StoreResponse<Option<Task>> {
        debug!(%id, "update: called");
        let id = id.to_string();
        self.request(|reply| StoreCommand::Update { id, patch, reply }).await
    }

    pub async fn delete(&self, id: &str) -> StoreResponse<bool> {
        debug!(%id, "delete: called");
        let id = id.to_string();
        self.request(|reply| StoreCommand::Delete { id, reply }).await
    }

    pub async fn cycle_status(&self, id: &str) -> StoreResponse<Option<Task>> {
        debug!(%id, "cycle_status: called");
        let id = id.to_string();
        self.request(|reply| StoreCommand::CycleStatus { id, reply }).await
    }

    pub async fn move_to_status(&self, id: &str, status: Status) -> StoreResponse<Option<Task>> {
        debug!(%id, %status, "move_to_status: called");
        let id = id.to_string();
        self.request(|reply| StoreCommand::MoveToStatus { id, status, reply })
            .await
    }

    // === Subtask operations ===

    pub async fn add_subtask(&self, task_id: &str, text: &str) -> StoreResponse<Option<Task>> {
        debug!(%task_id, "add_subtask: called");
        let task_id = task_id.to_string();
        let text = text.to_string();
        self.request(|reply| StoreCommand::AddSubtask { task_id, text, reply })
            .await
    }

    pub async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResponse<Option<Task>> {
        debug!(%task_id, %subtask_id, "toggle_subtask: called");
        let task_id = task_id.to_string();
        let subtask_id = subtask_id.to_string();
        self.request(|reply| StoreCommand::ToggleSubtask {
            task_id,
            subtask_id,
            reply,
        })
        .await
    }

    pub async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResponse<Option<Task>> {
        debug!(%task_id, %subtask_id, "delete_subtask: called");
        let task_id = task_id.to_string();
        let subtask_id = subtask_id.to_string();
        self.request(|reply| StoreCommand::DeleteSubtask {
            task_id,
            subtask_id,
            reply,
        })
        .await
    }

    // === Resource operations ===

    pub async fn add_resource(&self, task_id: &str, resource: NewResource) -> StoreResponse<Option<Task>> {
        debug!(%task_id, kind = %resource.kind, "add_resource: called");
        let task_id = task_id.to_string();
        self.request(|reply| StoreCommand::AddResource {
            task_id,
            resource,
            reply,
        })
        .await
    }

    pub async fn delete_resource(&self, task_id: &str, resource_id: &str) -> StoreResponse<Option<Task>> {
        debug!(%task_id, %resource_id, "delete_resource: called");
        let task_id = task_id.to_string();
        let resource_id = resource_id.to_string();
        self.request(|reply| StoreCommand::DeleteResource {
            task_id,
            resource_id,
            reply,
        })
        .await
    }

    /// Shutdown the StoreManager
    pub async fn shutdown(&self) -> StoreResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| StoreError::ChannelError)
    }
}

/// Snapshot of a task after a mutation that reported a change
fn snapshot_if(store: &TaskStore, changed: bool, id: &str) -> Option<Task> {
    if changed { store.get(id).cloned() } else { None }
}

/// Actor loop: owns the store and applies commands one at a time
async fn actor_loop(mut store: TaskStore, mut rx: mpsc::Receiver<StoreCommand>) {
    debug!("StoreManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::List { reply } => {
                debug!("actor_loop: List command");
                let _ = reply.send(store.tasks().to_vec());
            }

            StoreCommand::Get { id, reply } => {
                debug!(%id, "actor_loop: Get command");
                let _ = reply.send(store.get(&id).cloned());
            }

            StoreCommand::GroupByCategory { reply } => {
                debug!("actor_loop: GroupByCategory command");
                let _ = reply.send(store.group_by_category());
            }

            StoreCommand::GroupByStatus { reply } => {
                debug!("actor_loop: GroupByStatus command");
                let _ = reply.send(store.group_by_status());
            }

            StoreCommand::Append { tasks, reply } => {
                debug!(count = tasks.len(), "actor_loop: Append command");
                let before = store.len();
                store.append(tasks);
                let _ = reply.send(store.tasks()[before..].to_vec());
            }

            StoreCommand::Create { new, reply } => {
                debug!("actor_loop: Create command");
                let _ = reply.send(store.create(new).cloned());
            }

            StoreCommand::Update { id, patch, reply } => {
                debug!(%id, "actor_loop: Update command");
                let changed = store.update(&id, patch);
                let _ = reply.send(snapshot_if(&store, changed, &id));
            }

            StoreCommand::Delete { id, reply } => {
                debug!(%id, "actor_loop: Delete command");
                let _ = reply.send(store.delete(&id));
            }

            StoreCommand::CycleStatus { id, reply } => {
                debug!(%id, "actor_loop: CycleStatus command");
                let changed = store.cycle_status(&id);
                let _ = reply.send(snapshot_if(&store, changed, &id));
            }

            StoreCommand::MoveToStatus { id, status, reply } => {
                debug!(%id, %status, "actor_loop: MoveToStatus command");
                let changed = store.move_to_status(&id, status);
                let _ = reply.send(snapshot_if(&store, changed, &id));
            }

            StoreCommand::AddSubtask { task_id, text, reply } => {
                debug!(%task_id, "actor_loop: AddSubtask command");
                let changed = store.add_subtask(&task_id, &text).is_some();
                let _ = reply.send(snapshot_if(&store, changed, &task_id));
            }

            StoreCommand::ToggleSubtask {
                task_id,
                subtask_id,
                reply,
            } => {
                debug!(%task_id, %subtask_id, "actor_loop: ToggleSubtask command");
                let changed = store.toggle_subtask(&task_id, &subtask_id);
                let _ = reply.send(snapshot_if(&store, changed, &task_id));
            }

            StoreCommand::DeleteSubtask {
                task_id,
                subtask_id,
                reply,
            } => {
                debug!(%task_id, %subtask_id, "actor_loop: DeleteSubtask command");
                let changed = store.delete_subtask(&task_id, &subtask_id);
                let _ = reply.send(snapshot_if(&store, changed, &task_id));
            }

            StoreCommand::AddResource {
                task_id,
                resource,
                reply,
            } => {
                debug!(%task_id, "actor_loop: AddResource command");
                let changed = store.add_resource(&task_id, resource).is_some();
                let _ = reply.send(snapshot_if(&store, changed, &task_id));
            }

            StoreCommand::DeleteResource {
                task_id,
                resource_id,
                reply,
            } => {
                debug!(%task_id, %resource_id, "actor_loop: DeleteResource command");
                let changed = store.delete_resource(&task_id, &resource_id);
                let _ = reply.send(snapshot_if(&store, changed, &task_id));
            }

            StoreCommand::Shutdown => {
                info!("StoreManager shutting down");
                break;
            }
        }
    }

    debug!("StoreManager actor stopped");
}
