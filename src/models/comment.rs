//! Task comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationErrors;

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// A comment on a task. Only the author may edit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub author_id: String,
    pub author_email: String,
    pub author_name: String,
    pub content: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    /// Task id
    pub task: String,
    pub content: String,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_content(&mut errors, &self.content);
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

impl UpdateCommentRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_content(&mut errors, &self.content);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentQuery {
    #[serde(default)]
    pub task: Option<String>,
}

fn check_content(errors: &mut ValidationErrors, content: &str) {
    if content.trim().is_empty() {
        errors.add("content", "This field may not be blank.");
    } else if content.chars().count() > MAX_COMMENT_LENGTH {
        errors.add(
            "content",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_COMMENT_LENGTH
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_bounds() {
        let ok = UpdateCommentRequest {
            content: "x".repeat(MAX_COMMENT_LENGTH),
        };
        assert!(ok.validate().is_empty());

        let long = UpdateCommentRequest {
            content: "x".repeat(MAX_COMMENT_LENGTH + 1),
        };
        assert!(long.validate().has("content"));

        let blank = CreateCommentRequest {
            task: "t".to_string(),
            content: "  ".to_string(),
        };
        assert!(blank.validate().has("content"));
    }
}
