//! Task list API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{created, success, unindex_tasks, ApiResult};
use crate::auth::Principal;
use crate::errors::{AppError, ValidationErrors};
use crate::models::{
    check_position, CreateTaskListRequest, ReorderRequest, TaskList, TaskListDetail,
    TaskListQuery, UpdateTaskListRequest,
};
use crate::AppState;

/// GET /api/task-lists - Filter by `project`, `archived` and `search`.
pub async fn list_task_lists(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Vec<TaskList>> {
    if let Some(project_id) = &query.project {
        let scope = state.repo.project_scope(&principal.user_id, project_id).await?;
        scope.access.require_view()?;
    }

    success(state.repo.list_task_lists(&principal.user_id, &query).await?)
}

/// POST /api/task-lists - Appends to the project unless a free position is given.
pub async fn create_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateTaskListRequest>,
) -> ApiResult<TaskList> {
    request.validate().into_result()?;
    let scope = state
        .repo
        .project_scope(&principal.user_id, &request.project)
        .await?;
    scope.access.require_edit()?;

    created(state.repo.create_task_list(&request).await?)
}

/// GET /api/task-lists/{id} - List with its non-archived tasks.
pub async fn get_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<TaskListDetail> {
    let scope = state.repo.task_list_scope(&principal.user_id, &id).await?;
    scope.access.require_view()?;

    success(state.repo.get_task_list_detail(&id).await?)
}

/// PUT /api/task-lists/{id} - Full update; `name` is required.
pub async fn replace_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskListRequest>,
) -> ApiResult<TaskList> {
    write_task_list(&state, &principal, &id, &request, true).await
}

/// PATCH /api/task-lists/{id}
pub async fn update_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskListRequest>,
) -> ApiResult<TaskList> {
    write_task_list(&state, &principal, &id, &request, false).await
}

async fn write_task_list(
    state: &AppState,
    principal: &Principal,
    id: &str,
    request: &UpdateTaskListRequest,
    require_name: bool,
) -> ApiResult<TaskList> {
    let scope = state.repo.task_list_scope(&principal.user_id, id).await?;
    scope.access.require_edit()?;
    request.validate(require_name).into_result()?;

    // Moving a list needs edit rights on both boards.
    if let Some(target) = request.project.as_deref() {
        if target != scope.project_id {
            let target_scope = state.repo.project_scope(&principal.user_id, target).await?;
            target_scope.access.require_edit()?;
        }
    }

    success(state.repo.update_task_list(id, request).await?)
}

/// DELETE /api/task-lists/{id} - Deletes its tasks and closes the position gap.
pub async fn delete_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scope = state.repo.task_list_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;

    let task_ids = state.repo.delete_task_list(&id).await?;
    unindex_tasks(&state, &task_ids).await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/task-lists/{id}/reorder
pub async fn reorder_task_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<TaskList> {
    let mut errors = ValidationErrors::new();
    check_position(&mut errors, "newPosition", request.new_position);
    errors.into_result()?;

    let scope = state.repo.task_list_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;

    success(state.repo.reorder_task_list(&id, request.new_position).await?)
}
