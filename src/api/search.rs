//! Task search endpoint.

use axum::extract::{Query, State};
use axum::Extension;
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::Principal;
use crate::models::Task;
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
/// Index hits considered before visibility filtering and paging.
const MAX_CANDIDATES: usize = 500;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl SearchParams {
    fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of visible matches. `total` counts every visible match, not just this page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<TaskMatch>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMatch {
    pub task: Task,
    pub score: f32,
}

/// GET /api/search - Full-text search over the tasks the caller can view.
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchPage> {
    let limit = params.page_size();

    let hits = state.search.search(&params.q, MAX_CANDIDATES)?;
    let candidate_ids: Vec<String> = hits.iter().map(|hit| hit.task_id.clone()).collect();
    // Index entries for deleted tasks fall out here along with hidden ones.
    let viewable = state
        .repo
        .viewable_task_ids(&principal.user_id, &candidate_ids)
        .await?;

    let visible: Vec<_> = hits
        .into_iter()
        .filter(|hit| viewable.contains(&hit.task_id))
        .collect();

    let mut results = Vec::with_capacity(limit);
    for hit in visible.iter().skip(params.offset).take(limit) {
        if let Some(task) = state.repo.get_task(&hit.task_id).await? {
            results.push(TaskMatch {
                task,
                score: hit.score,
            });
        }
    }

    tracing::debug!(
        user_id = %principal.user_id,
        candidates = candidate_ids.len(),
        visible = visible.len(),
        "Task search"
    );
    success(SearchPage {
        results,
        total: visible.len(),
        limit,
        offset: params.offset,
    })
}
