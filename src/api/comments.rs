//! Task comment API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{created, reindex_task, success, ApiResult};
use crate::access::require_comment_edit;
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::{Comment, CommentQuery, CreateCommentRequest, UpdateCommentRequest};
use crate::AppState;

/// GET /api/task-comments - Comments of one task, or of every task the caller can reach.
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<CommentQuery>,
) -> ApiResult<Vec<Comment>> {
    let comments = match &query.task {
        Some(task_id) => {
            let scope = state.repo.task_scope(&principal.user_id, task_id).await?;
            scope.access.require_view()?;
            state.repo.list_comments(task_id).await?
        }
        None => state.repo.list_visible_comments(&principal.user_id).await?,
    };
    success(comments)
}

/// POST /api/task-comments - Anyone who can view the task may comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Comment> {
    request.validate().into_result()?;
    let scope = state.repo.task_scope(&principal.user_id, &request.task).await?;
    scope.access.require_view()?;

    let comment = state
        .repo
        .create_comment(&request.task, &principal.user_id, &request.content)
        .await?;
    reindex_task(&state, &request.task).await;
    created(comment)
}

/// GET /api/task-comments/{id}
pub async fn get_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Comment> {
    let scope = state.repo.comment_scope(&principal.user_id, &id).await?;
    scope.project.access.require_view()?;

    let comment = state
        .repo
        .get_comment(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;
    success(comment)
}

/// PUT/PATCH /api/task-comments/{id} - Author only.
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<Comment> {
    let scope = state.repo.comment_scope(&principal.user_id, &id).await?;
    scope.project.access.require_view()?;
    require_comment_edit(&scope.author_id, &principal.user_id)?;
    request.validate().into_result()?;

    let comment = state.repo.update_comment(&id, &request.content).await?;
    reindex_task(&state, &scope.task_id).await;
    success(comment)
}

/// DELETE /api/task-comments/{id} - Author, or anyone who can edit the project.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scope = state.repo.comment_scope(&principal.user_id, &id).await?;
    scope.project.access.require_view()?;
    scope
        .project
        .access
        .require_comment_delete(&scope.author_id, &principal.user_id)?;

    state.repo.delete_comment(&id).await?;
    reindex_task(&state, &scope.task_id).await;

    Ok(StatusCode::NO_CONTENT)
}
