//! REST API module.
//!
//! Handlers resolve the principal, load the owning project's scope, ask the
//! access engine for a decision and only then touch the store.

mod auth;
mod comments;
mod projects;
mod search;
mod task_lists;
mod tasks;

pub use auth::*;
pub use comments::*;
pub use projects::*;
pub use search::*;
pub use task_lists::*;
pub use tasks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::search::IndexChange;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::OK,
        }
    }

    /// Same envelope, answered with `201 Created`.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::new(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create a `201 Created` API response.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::created(data))
}

/// Refresh a task's search document. Index failures never fail the request.
async fn reindex_task(state: &AppState, task_id: &str) {
    let text = match state.repo.task_search_text(task_id).await {
        Ok(Some(text)) => text,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(task_id = %task_id, "Failed to load task for indexing: {}", e);
            return;
        }
    };
    if let Err(e) = state.search.apply(IndexChange::Upsert(text)).await {
        tracing::warn!(task_id = %task_id, "Failed to index task: {}", e);
    }
}

async fn unindex_tasks(state: &AppState, task_ids: &[String]) {
    if let Err(e) = state.search.apply(IndexChange::Remove(task_ids.to_vec())).await {
        tracing::warn!(count = task_ids.len(), "Failed to remove tasks from index: {}", e);
    }
}
