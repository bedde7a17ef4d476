use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::WorkspaceStatus;
use crate::services::workspace::{TaskInput, TaskPatch, WorkspaceInput, WorkspacePatch};
use crate::services::WorkspaceService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<WorkspaceStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TaskComment {
    #[serde(default)]
    pub body: String,
}

fn workspaces(state: &AppState) -> WorkspaceService {
    WorkspaceService::new(state.store.clone())
}

/// GET /api/admin/workspaces
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Value>> {
    Ok(ApiResponse::success(workspaces(&state).list(query.status).await?))
}

/// POST /api/admin/workspaces
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<WorkspaceInput>,
) -> ApiResult<Value> {
    let doc = workspaces(&state).create(&auth, input).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/admin/workspaces/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    Ok(ApiResponse::success(workspaces(&state).get(&id).await?.to_json()))
}

/// PATCH /api/admin/workspaces/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<WorkspacePatch>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(workspaces(&state).update(&id, patch).await?.to_json()))
}

/// DELETE /api/admin/workspaces/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    workspaces(&state).delete(&id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/admin/workspaces/:id/tasks
pub async fn add_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<Value> {
    Ok(ApiResponse::created(workspaces(&state).add_task(&id, input).await?.to_json()))
}

/// PATCH /api/admin/workspaces/:id/tasks/:task_id
pub async fn update_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(workspaces(&state).update_task(&id, &task_id, patch).await?.to_json()))
}

/// DELETE /api/admin/workspaces/:id/tasks/:task_id
pub async fn delete_task(State(state): State<AppState>, Path((id, task_id)): Path<(String, String)>) -> ApiResult<Value> {
    Ok(ApiResponse::success(workspaces(&state).delete_task(&id, &task_id).await?.to_json()))
}

/// POST /api/admin/workspaces/:id/tasks/:task_id/comments
pub async fn comment_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, task_id)): Path<(String, String)>,
    ApiJson(comment): ApiJson<TaskComment>,
) -> ApiResult<Value> {
    let doc = workspaces(&state)
        .comment_task(&auth, &id, &task_id, &comment.body)
        .await?;
    Ok(ApiResponse::created(doc.to_json()))
}
