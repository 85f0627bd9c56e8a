//! Task API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{created, reindex_task, success, unindex_tasks, ApiResult};
use crate::auth::Principal;
use crate::errors::{AppError, ValidationErrors};
use crate::models::{
    check_position, ArchiveTaskRequest, BulkUpdateRequest, BulkUpdateResult, CompleteTaskRequest,
    CreateTaskRequest, MoveTaskRequest, Task, TaskDetail, TaskQuery, UpdateTaskRequest,
};
use crate::AppState;

/// GET /api/tasks - Tasks in board order, with optional filters.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Vec<Task>> {
    let tasks = match &query.task_list {
        Some(task_list_id) => {
            let scope = state
                .repo
                .task_list_scope(&principal.user_id, task_list_id)
                .await?;
            scope.access.require_view()?;
            state.repo.list_tasks_in_list(task_list_id, &query).await?
        }
        None => state.repo.list_tasks(&principal.user_id, &query).await?,
    };
    success(tasks)
}

/// POST /api/tasks - The caller becomes the creator.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    request.validate().into_result()?;
    let scope = state
        .repo
        .task_list_scope(&principal.user_id, &request.task_list)
        .await?;
    scope.access.require_edit()?;

    let task = state.repo.create_task(&principal.user_id, &request).await?;
    reindex_task(&state, &task.id).await;
    created(task)
}

/// GET /api/tasks/{id} - Task with assignees and comments.
pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<TaskDetail> {
    let scope = state.repo.task_scope(&principal.user_id, &id).await?;
    scope.access.require_view()?;

    success(state.repo.get_task_detail(&id).await?)
}

/// PUT /api/tasks/{id} - Full update; `title` is required.
pub async fn replace_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    write_task(&state, &principal, &id, &request, true).await
}

/// PATCH /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    write_task(&state, &principal, &id, &request, false).await
}

async fn write_task(
    state: &AppState,
    principal: &Principal,
    id: &str,
    request: &UpdateTaskRequest,
    require_title: bool,
) -> ApiResult<Task> {
    let scope = state.repo.task_scope(&principal.user_id, id).await?;
    scope.access.require_edit()?;
    request.validate(require_title).into_result()?;

    let task = state.repo.update_task(id, request).await?;
    reindex_task(state, id).await;
    success(task)
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scope = state.repo.task_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;

    state.repo.delete_task(&id).await?;
    unindex_tasks(&state, std::slice::from_ref(&id)).await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/{id}/move - Reorder within the list or move to `targetList`.
pub async fn move_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<MoveTaskRequest>,
) -> ApiResult<Task> {
    if let Some(position) = request.new_position {
        let mut errors = ValidationErrors::new();
        check_position(&mut errors, "newPosition", position);
        errors.into_result()?;
    }

    let scope = state.repo.task_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;
    if let Some(target_list) = request.target_list.as_deref() {
        let target_scope = state
            .repo
            .task_list_scope(&principal.user_id, target_list)
            .await?;
        target_scope.access.require_edit()?;
    }

    let task = state
        .repo
        .move_task(&id, request.target_list.as_deref(), request.new_position)
        .await?;
    success(task)
}

/// POST /api/tasks/{id}/complete - Idempotent completion toggle.
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<CompleteTaskRequest>,
) -> ApiResult<Task> {
    let scope = state.repo.task_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;

    success(state.repo.set_task_completed(&id, request.is_completed).await?)
}

/// POST /api/tasks/{id}/archive
pub async fn archive_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<ArchiveTaskRequest>,
) -> ApiResult<Task> {
    let scope = state.repo.task_scope(&principal.user_id, &id).await?;
    scope.access.require_edit()?;

    success(state.repo.set_task_archived(&id, request.is_archived).await?)
}

/// POST /api/tasks/bulk_update
///
/// Every task must exist and be editable by the caller before anything is
/// written; one refusal rejects the whole batch.
pub async fn bulk_update_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BulkUpdateRequest>,
) -> ApiResult<BulkUpdateResult> {
    let mut task_ids: Vec<String> = Vec::with_capacity(request.task_ids.len());
    for task_id in request.task_ids {
        if !task_ids.contains(&task_id) {
            task_ids.push(task_id);
        }
    }
    if task_ids.is_empty() {
        return Err(AppError::field("taskIds", "This list may not be empty."));
    }

    let mut errors = ValidationErrors::new();
    let mut forbidden = None;
    for task_id in &task_ids {
        match state.repo.task_scope(&principal.user_id, task_id).await {
            Ok(scope) => {
                if let Err(err) = scope.access.require_edit() {
                    forbidden.get_or_insert(err);
                }
            }
            Err(AppError::NotFound(_)) => {
                errors.add("taskIds", format!("Task {} does not exist.", task_id));
            }
            Err(err) => return Err(err),
        }
    }
    errors.into_result()?;
    if let Some(err) = forbidden {
        tracing::warn!(
            user_id = %principal.user_id,
            count = task_ids.len(),
            "Bulk update refused"
        );
        return Err(err);
    }

    let tasks = state
        .repo
        .bulk_update_tasks(&task_ids, request.action)
        .await?;
    success(BulkUpdateResult {
        updated_count: tasks.len(),
        tasks,
    })
}
