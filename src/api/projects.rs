//! Project and membership API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{created, success, unindex_tasks, ApiResult};
use crate::auth::Principal;
use crate::db::ProjectFilter;
use crate::errors::AppError;
use crate::models::{
    normalize_email, AddMemberRequest, CreateProjectRequest, Membership, Project, ProjectDetail,
    ProjectListQuery, UpdateMemberRoleRequest, UpdateProjectRequest,
};
use crate::AppState;

/// GET /api/projects - Projects the caller owns or belongs to.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .repo
        .list_projects(&principal.user_id, ProjectFilter::All, query.archived)
        .await?;
    success(projects)
}

/// GET /api/projects/my_projects
pub async fn my_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .repo
        .list_projects(&principal.user_id, ProjectFilter::Owned, query.archived)
        .await?;
    success(projects)
}

/// GET /api/projects/shared_with_me
pub async fn shared_with_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .repo
        .list_projects(&principal.user_id, ProjectFilter::Shared, query.archived)
        .await?;
    success(projects)
}

/// POST /api/projects - The caller becomes the owner.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Project> {
    request.validate().into_result()?;
    created(state.repo.create_project(&principal.user_id, &request).await?)
}

/// GET /api/projects/{id} - Project with roster and the caller's role.
pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<ProjectDetail> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_view()?;

    success(state.repo.get_project_detail(&id, scope.access.role).await?)
}

/// PUT /api/projects/{id} - Full update; `name` is required.
pub async fn replace_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Project> {
    write_project(&state, &principal, &id, &request, true).await
}

/// PATCH /api/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Project> {
    write_project(&state, &principal, &id, &request, false).await
}

async fn write_project(
    state: &AppState,
    principal: &Principal,
    id: &str,
    request: &UpdateProjectRequest,
    require_name: bool,
) -> ApiResult<Project> {
    let scope = state.repo.project_scope(&principal.user_id, id).await?;
    scope.access.require_edit()?;
    request.validate(require_name).into_result()?;

    success(state.repo.update_project(id, request).await?)
}

/// DELETE /api/projects/{id} - Owner only; cascades to lists, tasks and comments.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_delete_project()?;

    let task_ids = state.repo.delete_project(&id).await?;
    unindex_tasks(&state, &task_ids).await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/projects/{id}/add_member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<Membership> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_administer()?;

    let membership = state
        .repo
        .add_member(
            &id,
            &normalize_email(&request.email),
            request.role,
            &principal.user_id,
        )
        .await?;
    created(membership)
}

/// GET /api/projects/{id}/members - Roster, newest first. The owner is not listed.
pub async fn list_members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Membership>> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_view()?;

    success(state.repo.list_members(&id).await?)
}

/// DELETE /api/projects/{id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_administer()?;

    state.repo.remove_member(&id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/projects/{id}/members/{user_id}/role
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, user_id)): Path<(String, String)>,
    Json(request): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Membership> {
    let scope = state.repo.project_scope(&principal.user_id, &id).await?;
    scope.access.require_role_change(&user_id, &scope.owner_id)?;

    success(state.repo.update_member_role(&id, &user_id, request.role).await?)
}
