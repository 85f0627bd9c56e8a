//! Project and membership roster persistence.

use chrono::Utc;
use sqlx::Row;

use super::repository::{
    membership_from_row, new_id, project_from_row, MEMBERSHIP_SELECT, PROJECT_SELECT,
};
use super::tasks::prune_assignees;
use super::Repository;
use crate::errors::{AppError, MembershipError};
use crate::models::{
    normalize_email, CreateProjectRequest, MemberRole, Membership, Project, ProjectDetail, Role,
    UpdateProjectRequest, Visibility, DEFAULT_BACKGROUND_COLOR,
};

/// Which projects a listing covers, relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFilter {
    /// Owned or shared with the caller
    All,
    Owned,
    /// Member of, but not owner
    Shared,
}

impl Repository {
    /// Create a project owned by `owner_id`.
    pub async fn create_project(
        &self,
        owner_id: &str,
        request: &CreateProjectRequest,
    ) -> Result<Project, AppError> {
        let id = new_id();
        let now = Utc::now();
        let visibility = request.visibility.unwrap_or_default();

        sqlx::query(
            r#"INSERT INTO projects
               (id, name, description, owner_id, is_private, is_archived, background_color,
                background_image, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(request.description.as_deref().unwrap_or_default())
        .bind(owner_id)
        .bind(visibility.is_private())
        .bind(
            request
                .background_color
                .as_deref()
                .unwrap_or(DEFAULT_BACKGROUND_COLOR),
        )
        .bind(&request.background_image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(project_id = %id, owner_id = %owner_id, "Project created");

        self.require_project(&id).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", PROJECT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(project_from_row))
    }

    async fn require_project(&self, id: &str) -> Result<Project, AppError> {
        self.get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))
    }

    /// Project with its roster and the caller's role.
    pub async fn get_project_detail(&self, id: &str, user_role: Role) -> Result<ProjectDetail, AppError> {
        let project = self.require_project(id).await?;
        let members = self.list_members(id).await?;
        Ok(ProjectDetail {
            project,
            members,
            user_role,
        })
    }

    /// Projects visible in the caller's listings, newest first.
    pub async fn list_projects(
        &self,
        user_id: &str,
        filter: ProjectFilter,
        archived: Option<bool>,
    ) -> Result<Vec<Project>, AppError> {
        let scope = match filter {
            ProjectFilter::All => {
                "(p.owner_id = ?1 OR EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ?1))"
            }
            ProjectFilter::Owned => "p.owner_id = ?1",
            ProjectFilter::Shared => {
                "(p.owner_id != ?1 AND EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ?1))"
            }
        };

        let mut sql = format!("{} WHERE {}", PROJECT_SELECT, scope);
        if archived.is_some() {
            sql.push_str(" AND p.is_archived = ?2");
        }
        sql.push_str(" ORDER BY p.updated_at DESC");

        let mut query = sqlx::query(&sql).bind(user_id);
        if let Some(archived) = archived {
            query = query.bind(archived);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Apply a partial update. The owner never changes.
    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project, AppError> {
        let existing = self.require_project(id).await?;

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name);
        let description = request
            .description
            .as_ref()
            .unwrap_or(&existing.description);
        let visibility = request.visibility.unwrap_or(existing.visibility);
        let is_archived = request.is_archived.unwrap_or(existing.is_archived);
        let background_color = request
            .background_color
            .as_ref()
            .unwrap_or(&existing.background_color);
        let background_image = match &request.background_image {
            Some(image) => image.clone(),
            None => existing.background_image.clone(),
        };

        sqlx::query(
            r#"UPDATE projects SET name = ?, description = ?, is_private = ?, is_archived = ?,
                   background_color = ?, background_image = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(name)
        .bind(description)
        .bind(visibility == Visibility::Private)
        .bind(is_archived)
        .bind(background_color)
        .bind(&background_image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        tracing::info!(project_id = %id, "Project updated");

        self.require_project(id).await
    }

    /// Delete a project and everything under it in one transaction.
    ///
    /// Returns the ids of the deleted tasks so the caller can drop them from the index.
    pub async fn delete_project(&self, id: &str) -> Result<Vec<String>, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        let task_ids: Vec<String> = sqlx::query(
            "SELECT t.id FROM tasks t JOIN task_lists l ON l.id = t.task_list_id WHERE l.project_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| row.get("id"))
        .collect();

        let in_project_tasks =
            "(SELECT t.id FROM tasks t JOIN task_lists l ON l.id = t.task_list_id WHERE l.project_id = ?)";
        sqlx::query(&format!(
            "DELETE FROM task_comments WHERE task_id IN {}",
            in_project_tasks
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM task_assignees WHERE task_id IN {}",
            in_project_tasks
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM tasks WHERE task_list_id IN (SELECT id FROM task_lists WHERE project_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM task_lists WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM project_memberships WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(project_id = %id, tasks = task_ids.len(), "Project deleted");
        Ok(task_ids)
    }

    // ==================== MEMBERSHIP OPERATIONS ====================

    /// Add the user registered under `email` to the roster.
    pub async fn add_member(
        &self,
        project_id: &str,
        email: &str,
        role: MemberRole,
        invited_by: &str,
    ) -> Result<Membership, AppError> {
        let project = self.require_project(project_id).await?;
        let user = self
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(MembershipError::UserNotFound)?;

        if user.id == project.owner_id {
            return Err(MembershipError::AlreadyOwner.into());
        }

        let id = new_id();
        let result = sqlx::query(
            "INSERT INTO project_memberships (id, project_id, user_id, role, invited_by, joined_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(&user.id)
        .bind(role.as_str())
        .bind(invited_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            if err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                return Err(MembershipError::AlreadyMember.into());
            }
            return Err(err.into());
        }

        tracing::info!(
            project_id = %project_id,
            user_id = %user.id,
            role = role.as_str(),
            "Member added"
        );

        self.get_membership(project_id, &user.id)
            .await?
            .ok_or_else(|| AppError::Internal("Membership vanished after insert".to_string()))
    }

    /// Roster rows, newest first. The owner is never part of the roster.
    pub async fn list_members(&self, project_id: &str) -> Result<Vec<Membership>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE m.project_id = ? ORDER BY m.joined_at DESC",
            MEMBERSHIP_SELECT
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(membership_from_row).collect())
    }

    pub async fn get_membership(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE m.project_id = ? AND m.user_id = ?",
            MEMBERSHIP_SELECT
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(membership_from_row))
    }

    /// Remove a member along with their assignments on the project's tasks.
    pub async fn remove_member(&self, project_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM project_memberships WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MembershipError::NotFound.into());
        }
        prune_assignees(&mut tx, project_id).await?;
        tx.commit().await?;

        tracing::info!(project_id = %project_id, user_id = %user_id, "Member removed");
        Ok(())
    }

    pub async fn update_member_role(
        &self,
        project_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<Membership, AppError> {
        let result = sqlx::query(
            "UPDATE project_memberships SET role = ? WHERE project_id = ? AND user_id = ?",
        )
        .bind(role.as_str())
        .bind(project_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MembershipError::NotFound.into());
        }

        tracing::info!(
            project_id = %project_id,
            user_id = %user_id,
            role = role.as_str(),
            "Member role changed"
        );

        self.get_membership(project_id, user_id)
            .await?
            .ok_or_else(|| MembershipError::NotFound.into())
    }

    /// Roster size plus the owner.
    pub async fn members_count(&self, project_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) + 1 AS count FROM project_memberships WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    /// Whether `user_id` is the owner or on the roster of `project_id`.
    pub async fn is_participant(&self, project_id: &str, user_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"SELECT 1 FROM projects p
               WHERE p.id = ?1 AND (p.owner_id = ?2 OR EXISTS
                   (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ?2))"#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
