//! Task (card) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_position, double_option, Comment, UserSummary};
use crate::errors::ValidationErrors;

pub const MAX_TASK_TITLE_LENGTH: usize = 200;
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 2000;

/// Allowed task label colors.
pub const LABEL_COLORS: [&str; 10] = [
    "#61bd4f", // Green
    "#f2d600", // Yellow
    "#ff9f1a", // Orange
    "#eb5a46", // Red
    "#c377e0", // Purple
    "#0079bf", // Blue
    "#00c2e0", // Sky
    "#51e898", // Lime
    "#ff78cb", // Pink
    "#344563", // Black
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// A card inside a task list.
///
/// `position` is an ordering hint: it is not unique within a list, and readers
/// break ties on `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_list_id: String,
    pub task_list_name: String,
    pub project_id: String,
    pub project_name: String,
    pub position: i64,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    pub assignees: Vec<UserSummary>,
    pub assignees_count: usize,
    pub creator_id: String,
    pub creator_email: String,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_archived: bool,
    /// Derived on read, never stored
    pub is_overdue: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with its comment thread.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub comments: Vec<Comment>,
}

/// `completed_at` for a task about to be persisted with `is_completed`.
///
/// Keeps an existing timestamp while the task stays completed, stamps `now` on
/// the false -> true transition and clears it otherwise.
pub fn derive_completed_at(
    is_completed: bool,
    existing: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if is_completed {
        Some(existing.unwrap_or(now))
    } else {
        None
    }
}

/// A task is overdue when it has a due date strictly in the past and is not completed.
pub fn is_overdue(due_date: Option<DateTime<Utc>>, is_completed: bool, now: DateTime<Utc>) -> bool {
    match due_date {
        Some(due) if !is_completed => due < now,
        _ => false,
    }
}

/// Request body for creating a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Owning task list id
    pub task_list: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub label_color: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_title(&mut errors, &self.title);
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        if let Some(position) = self.position {
            check_position(&mut errors, "position", position);
        }
        if let Some(color) = &self.label_color {
            check_label_color(&mut errors, color);
        }
        errors
    }
}

/// Request body for updating a task. `labelColor` and `dueDate` accept `null` to clear.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub label_color: Option<Option<String>>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

impl UpdateTaskRequest {
    pub fn validate(&self, require_title: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match &self.title {
            Some(title) => check_title(&mut errors, title),
            None if require_title => errors.add("title", "This field is required."),
            None => {}
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        if let Some(Some(color)) = &self.label_color {
            check_label_color(&mut errors, color);
        }
        errors
    }
}

/// Request body for `POST /tasks/{id}/move`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    #[serde(default)]
    pub target_list: Option<String>,
    #[serde(default)]
    pub new_position: Option<i64>,
}

/// Request body for `POST /tasks/{id}/complete`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    pub is_completed: bool,
}

/// Request body for `POST /tasks/{id}/archive`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveTaskRequest {
    #[serde(default = "default_archived")]
    pub is_archived: bool,
}

fn default_archived() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Complete,
    Incomplete,
    Archive,
    Unarchive,
}

/// Request body for `POST /tasks/bulk_update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    pub task_ids: Vec<String>,
    pub action: BulkAction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    pub updated_count: usize,
    pub tasks: Vec<Task>,
}

/// Query parameters for task listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(default)]
    pub task_list: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    if title.trim().is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        errors.add(
            "title",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_TASK_TITLE_LENGTH
            ),
        );
    }
}

fn check_description(errors: &mut ValidationErrors, description: &str) {
    if description.chars().count() > MAX_TASK_DESCRIPTION_LENGTH {
        errors.add(
            "description",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_TASK_DESCRIPTION_LENGTH
            ),
        );
    }
}

fn check_label_color(errors: &mut ValidationErrors, color: &str) {
    if !LABEL_COLORS.contains(&color) {
        errors.add("labelColor", format!("\"{}\" is not a valid choice.", color));
    }
}
