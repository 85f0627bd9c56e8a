//! Task list (board column) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Task;
use crate::errors::ValidationErrors;

pub const MAX_TASK_LIST_NAME_LENGTH: usize = 100;

/// A column on a project board. Positions are unique per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub project_name: String,
    pub position: i64,
    pub is_archived: bool,
    /// Number of non-archived tasks
    pub tasks_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task list with its non-archived tasks in board order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListDetail {
    #[serde(flatten)]
    pub list: TaskList,
    pub tasks: Vec<Task>,
}

/// Request body for creating a task list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskListRequest {
    pub name: String,
    /// Owning project id
    pub project: String,
    #[serde(default)]
    pub position: Option<i64>,
}

impl CreateTaskListRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_list_name(&mut errors, &self.name);
        if let Some(position) = self.position {
            check_position(&mut errors, "position", position);
        }
        errors
    }
}

/// Request body for updating a task list. A new `project` moves the list across boards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskListRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

impl UpdateTaskListRequest {
    pub fn validate(&self, require_name: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match &self.name {
            Some(name) => check_list_name(&mut errors, name),
            None if require_name => errors.add("name", "This field is required."),
            None => {}
        }
        errors
    }
}

/// Request body for `POST /task-lists/{id}/reorder` and the position part of task moves.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub new_position: i64,
}

/// Query parameters for task list listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

fn check_list_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "This field may not be blank.");
    } else if name.chars().count() > MAX_TASK_LIST_NAME_LENGTH {
        errors.add(
            "name",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_TASK_LIST_NAME_LENGTH
            ),
        );
    }
}

pub fn check_position(errors: &mut ValidationErrors, field: &str, position: i64) {
    if position < 0 {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation() {
        let ok = CreateTaskListRequest {
            name: "To Do".to_string(),
            project: "p".to_string(),
            position: Some(0),
        };
        assert!(ok.validate().is_empty());

        let bad = CreateTaskListRequest {
            name: String::new(),
            project: "p".to_string(),
            position: Some(-1),
        };
        let errors = bad.validate();
        assert!(errors.has("name"));
        assert!(errors.has("position"));
    }
}
