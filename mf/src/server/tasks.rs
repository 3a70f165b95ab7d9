//! Task routes
//!
//! Thin adapters over [`StoreManager`](crate::store::StoreManager). Absent
//! ids answer `200` with `null`, never an error status.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::{AppState, ServerError};
use crate::domain::{NewResource, NewTask, Status, Task, TaskPatch};
use crate::store::{CategoryGroup, StatusColumn};

type TaskResult = Result<Json<Option<Task>>, ServerError>;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    status: Status,
}

#[derive(Debug, Deserialize)]
pub struct SubtaskRequest {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    deleted: bool,
}

/// GET /api/tasks
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ServerError> {
    Ok(Json(state.session.store().list().await?))
}

/// POST /api/tasks
pub async fn create_task(State(state): State<AppState>, Json(new): Json<NewTask>) -> TaskResult {
    Ok(Json(state.session.store().create(new).await?))
}

/// GET /api/tasks/{id}
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> TaskResult {
    Ok(Json(state.session.selected(&id).await?))
}

/// PATCH /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> TaskResult {
    Ok(Json(state.session.store().update(&id, patch).await?))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Deleted>, ServerError> {
    let deleted = state.session.store().delete(&id).await?;
    Ok(Json(Deleted { deleted }))
}

/// POST /api/tasks/{id}/cycle
pub async fn cycle_status(State(state): State<AppState>, Path(id): Path<String>) -> TaskResult {
    Ok(Json(state.session.store().cycle_status(&id).await?))
}

/// PUT /api/tasks/{id}/status
pub async fn move_to_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> TaskResult {
    Ok(Json(state.session.store().move_to_status(&id, req.status).await?))
}

/// POST /api/tasks/{id}/subtasks
pub async fn add_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubtaskRequest>,
) -> TaskResult {
    Ok(Json(state.session.store().add_subtask(&id, &req.text).await?))
}

/// POST /api/tasks/{id}/subtasks/{sid}/toggle
pub async fn toggle_subtask(State(state): State<AppState>, Path((id, sid)): Path<(String, String)>) -> TaskResult {
    Ok(Json(state.session.store().toggle_subtask(&id, &sid).await?))
}

/// DELETE /api/tasks/{id}/subtasks/{sid}
pub async fn delete_subtask(State(state): State<AppState>, Path((id, sid)): Path<(String, String)>) -> TaskResult {
    Ok(Json(state.session.store().delete_subtask(&id, &sid).await?))
}

/// POST /api/tasks/{id}/resources
pub async fn add_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(resource): Json<NewResource>,
) -> TaskResult {
    Ok(Json(state.session.store().add_resource(&id, resource).await?))
}

/// DELETE /api/tasks/{id}/resources/{rid}
pub async fn delete_resource(State(state): State<AppState>, Path((id, rid)): Path<(String, String)>) -> TaskResult {
    Ok(Json(state.session.store().delete_resource(&id, &rid).await?))
}

/// GET /api/tasks/by-category
pub async fn by_category(State(state): State<AppState>) -> Result<Json<Vec<CategoryGroup>>, ServerError> {
    Ok(Json(state.session.store().group_by_category().await?))
}

/// GET /api/tasks/by-status
pub async fn by_status(State(state): State<AppState>) -> Result<Json<Vec<StatusColumn>>, ServerError> {
    Ok(Json(state.session.store().group_by_status().await?))
}
