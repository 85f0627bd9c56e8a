//! Task comments and the searchable text of a task.

use chrono::Utc;
use sqlx::Row;

use super::repository::{comment_from_row, new_id, COMMENT_SELECT};
use super::Repository;
use crate::errors::AppError;
use crate::models::Comment;

/// The text of a task that goes into the search index.
#[derive(Debug, Clone)]
pub struct TaskSearchText {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
}

impl Repository {
    /// Comments on a task, oldest first.
    pub async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.task_id = ? ORDER BY c.created_at",
            COMMENT_SELECT
        ))
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Comments on tasks in projects the caller owns or belongs to, oldest first.
    pub async fn list_visible_comments(&self, user_id: &str) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(&format!(
            r#"{}
               JOIN tasks t ON t.id = c.task_id
               JOIN task_lists l ON l.id = t.task_list_id
               JOIN projects p ON p.id = l.project_id
               WHERE p.owner_id = ?1
                  OR EXISTS (SELECT 1 FROM project_memberships m
                             WHERE m.project_id = p.id AND m.user_id = ?1)
               ORDER BY c.created_at"#,
            COMMENT_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn require_comment(&self, id: &str) -> Result<Comment, AppError> {
        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    pub async fn create_comment(
        &self,
        task_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<Comment, AppError> {
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO task_comments (id, task_id, author_id, content, is_edited, created_at, updated_at)
               VALUES (?, ?, ?, ?, 0, ?, ?)"#,
        )
        .bind(&id)
        .bind(task_id)
        .bind(author_id)
        .bind(content.trim())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(comment_id = %id, task_id = %task_id, "Comment created");
        self.require_comment(&id).await
    }

    /// Replace a comment's content and mark it edited.
    pub async fn update_comment(&self, id: &str, content: &str) -> Result<Comment, AppError> {
        let result = sqlx::query(
            "UPDATE task_comments SET content = ?, is_edited = 1, updated_at = ? WHERE id = ?",
        )
        .bind(content.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        tracing::info!(comment_id = %id, "Comment updated");
        self.require_comment(id).await
    }

    pub async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        tracing::info!(comment_id = %id, "Comment deleted");
        Ok(())
    }

    /// Title, description and concatenated comments of a task, or `None` if it is gone.
    pub async fn task_search_text(&self, task_id: &str) -> Result<Option<TaskSearchText>, AppError> {
        let row = sqlx::query("SELECT id, title, description FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let comments: Vec<String> = sqlx::query(
            "SELECT content FROM task_comments WHERE task_id = ? ORDER BY created_at",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| row.get("content"))
        .collect();

        Ok(Some(TaskSearchText {
            task_id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            comments: comments.join("\n"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{project, test_db, user};
    use crate::errors::AppError;
    use crate::models::{CreateTaskListRequest, CreateTaskRequest};

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let db = test_db().await;
        let author = user(&db.repo, "author@example.com").await;
        let board = project(&db.repo, &author, "Board").await;
        let list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "To Do".to_string(),
                project: board.id.clone(),
                position: None,
            })
            .await
            .unwrap();
        let task = db
            .repo
            .create_task(
                &author.id,
                &CreateTaskRequest {
                    title: "Fix login".to_string(),
                    description: Some("Session expires too early".to_string()),
                    task_list: list.id.clone(),
                    position: None,
                    priority: None,
                    label_color: None,
                    assignees: Vec::new(),
                    due_date: None,
                },
            )
            .await
            .unwrap();

        let first = db
            .repo
            .create_comment(&task.id, &author.id, "  Reproduced on staging  ")
            .await
            .unwrap();
        assert_eq!(first.content, "Reproduced on staging");
        assert!(!first.is_edited);
        assert_eq!(first.author_email, "author@example.com");

        db.repo
            .create_comment(&task.id, &author.id, "Token refresh fails")
            .await
            .unwrap();

        let edited = db.repo.update_comment(&first.id, "Reproduced locally").await.unwrap();
        assert!(edited.is_edited);

        let thread = db.repo.list_comments(&task.id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].id, first.id);

        let text = db.repo.task_search_text(&task.id).await.unwrap().unwrap();
        assert!(text.comments.contains("Reproduced locally"));
        assert!(text.comments.contains("Token refresh fails"));

        let visible = db.repo.list_visible_comments(&author.id).await.unwrap();
        assert_eq!(visible.len(), 2);

        db.repo.delete_comment(&first.id).await.unwrap();
        assert!(matches!(
            db.repo.delete_comment(&first.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
