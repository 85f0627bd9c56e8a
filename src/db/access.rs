//! Loads the facts the access engine decides on.

use sqlx::Row;

use super::Repository;
use crate::access::{effective_role, ProjectAccess};
use crate::errors::AppError;
use crate::models::{MemberRole, Visibility};

/// A project the caller is acting on, with the caller's access to it.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub project_id: String,
    pub owner_id: String,
    pub access: ProjectAccess,
}

/// Where a comment lives and who wrote it.
#[derive(Debug, Clone)]
pub struct CommentScope {
    pub task_id: String,
    pub author_id: String,
    pub project: ProjectScope,
}

impl Repository {
    /// Resolve `user_id`'s access to a project. A missing project is `NotFound`.
    pub async fn project_scope(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<ProjectScope, AppError> {
        let row = sqlx::query(
            r#"SELECT p.owner_id, p.is_private, m.role
               FROM projects p
               LEFT JOIN project_memberships m ON m.project_id = p.id AND m.user_id = ?
               WHERE p.id = ?"#,
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

        let owner_id: String = row.get("owner_id");
        let is_private: bool = row.get("is_private");
        let membership: Option<String> = row.get("role");
        let role = effective_role(
            user_id,
            &owner_id,
            membership.as_deref().and_then(MemberRole::parse),
        );

        Ok(ProjectScope {
            project_id: project_id.to_string(),
            owner_id,
            access: ProjectAccess::new(role, Visibility::from_private_flag(is_private)),
        })
    }

    /// Access to the project owning a task list.
    pub async fn task_list_scope(
        &self,
        user_id: &str,
        task_list_id: &str,
    ) -> Result<ProjectScope, AppError> {
        let project_id = self.task_list_project_id(task_list_id).await?;
        self.project_scope(user_id, &project_id).await
    }

    pub(super) async fn task_list_project_id(&self, task_list_id: &str) -> Result<String, AppError> {
        let row = sqlx::query("SELECT project_id FROM task_lists WHERE id = ?")
            .bind(task_list_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task list {} not found", task_list_id)))?;
        Ok(row.get("project_id"))
    }

    /// Access to the project owning a task.
    pub async fn task_scope(&self, user_id: &str, task_id: &str) -> Result<ProjectScope, AppError> {
        let row = sqlx::query(
            r#"SELECT l.project_id FROM tasks t
               JOIN task_lists l ON l.id = t.task_list_id
               WHERE t.id = ?"#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))?;

        let project_id: String = row.get("project_id");
        self.project_scope(user_id, &project_id).await
    }

    /// Access to the project owning a comment, plus the comment's author.
    pub async fn comment_scope(
        &self,
        user_id: &str,
        comment_id: &str,
    ) -> Result<CommentScope, AppError> {
        let row = sqlx::query(
            r#"SELECT c.task_id, c.author_id, l.project_id FROM task_comments c
               JOIN tasks t ON t.id = c.task_id
               JOIN task_lists l ON l.id = t.task_list_id
               WHERE c.id = ?"#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;

        let project_id: String = row.get("project_id");
        Ok(CommentScope {
            task_id: row.get("task_id"),
            author_id: row.get("author_id"),
            project: self.project_scope(user_id, &project_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{project, test_db, user};
    use crate::errors::AppError;
    use crate::models::{MemberRole, Role};

    #[tokio::test]
    async fn test_scope_reflects_roster() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;
        let bob = user(&db.repo, "bob@example.com").await;
        let carol = user(&db.repo, "carol@example.com").await;
        let board = project(&db.repo, &alice, "Board").await;

        db.repo
            .add_member(&board.id, "bob@example.com", MemberRole::Viewer, &alice.id)
            .await
            .unwrap();

        let owner = db.repo.project_scope(&alice.id, &board.id).await.unwrap();
        assert_eq!(owner.access.role, Role::Owner);

        let viewer = db.repo.project_scope(&bob.id, &board.id).await.unwrap();
        assert_eq!(viewer.access.role, Role::Viewer);
        assert!(viewer.access.can_view());
        assert!(!viewer.access.can_edit());

        let outsider = db.repo.project_scope(&carol.id, &board.id).await.unwrap();
        assert_eq!(outsider.access.role, Role::None);
        assert!(!outsider.access.can_view());
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;

        let err = db.repo.project_scope(&alice.id, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
