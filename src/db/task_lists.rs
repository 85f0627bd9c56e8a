//! Task list persistence. Positions go through the strict ordering engine.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::ordering::TASK_LISTS;
use super::repository::{like_pattern, new_id, task_list_from_row, TASK_LIST_SELECT};
use super::tasks::prune_assignees;
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CreateTaskListRequest, TaskList, TaskListDetail, TaskListQuery, TaskQuery, UpdateTaskListRequest,
};

impl Repository {
    /// Task lists the caller can reach, ordered by project then position.
    ///
    /// With a `project` filter the caller must already have been checked for view
    /// access; without one, only projects the caller owns or belongs to are listed.
    pub async fn list_task_lists(
        &self,
        user_id: &str,
        query: &TaskListQuery,
    ) -> Result<Vec<TaskList>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(TASK_LIST_SELECT);

        match &query.project {
            Some(project_id) => {
                builder.push(" WHERE l.project_id = ").push_bind(project_id.clone());
            }
            None => {
                builder
                    .push(" WHERE (p.owner_id = ")
                    .push_bind(user_id.to_string())
                    .push(" OR EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ")
                    .push_bind(user_id.to_string())
                    .push("))");
            }
        }
        if let Some(archived) = query.archived {
            builder.push(" AND l.is_archived = ").push_bind(archived);
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            builder
                .push(" AND l.name LIKE ")
                .push_bind(like_pattern(search.trim()))
                .push(" ESCAPE '\\'");
        }
        builder.push(" ORDER BY l.project_id, l.position");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(task_list_from_row).collect())
    }

    pub async fn get_task_list(&self, id: &str) -> Result<Option<TaskList>, AppError> {
        let row = sqlx::query(&format!("{} WHERE l.id = ?", TASK_LIST_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(task_list_from_row))
    }

    async fn require_task_list(&self, id: &str) -> Result<TaskList, AppError> {
        self.get_task_list(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task list {} not found", id)))
    }

    /// Task list with its non-archived tasks in board order.
    pub async fn get_task_list_detail(&self, id: &str) -> Result<TaskListDetail, AppError> {
        let list = self.require_task_list(id).await?;
        let tasks = self
            .list_tasks_in_list(
                id,
                &TaskQuery {
                    archived: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        Ok(TaskListDetail { list, tasks })
    }

    /// Append a task list to its project, or insert it at an explicit position
    /// (clamped to the end) with later lists shifted down.
    pub async fn create_task_list(&self, request: &CreateTaskListRequest) -> Result<TaskList, AppError> {
        let id = new_id();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let position = TASK_LISTS
            .append_position(&mut tx, &request.project, request.position)
            .await?;

        sqlx::query(
            "INSERT INTO task_lists (id, name, project_id, position, is_archived, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&request.project)
        .bind(position)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(task_list_id = %id, project_id = %request.project, position, "Task list created");
        self.require_task_list(&id).await
    }

    /// Rename or archive a list. A different `project` moves it to the end of that
    /// project in the same transaction.
    pub async fn update_task_list(
        &self,
        id: &str,
        request: &UpdateTaskListRequest,
    ) -> Result<TaskList, AppError> {
        let existing = self.require_task_list(id).await?;

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name);
        let is_archived = request.is_archived.unwrap_or(existing.is_archived);

        let mut tx = self.pool.begin().await?;
        if let Some(project_id) = request
            .project
            .as_deref()
            .filter(|project_id| *project_id != existing.project_id)
        {
            relocate_list(&mut tx, id, &existing.project_id, project_id, None).await?;
        }

        sqlx::query("UPDATE task_lists SET name = ?, is_archived = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(is_archived)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(task_list_id = %id, "Task list updated");
        self.require_task_list(id).await
    }

    /// Move a list into another project, closing the gap it leaves behind.
    pub async fn move_task_list(
        &self,
        id: &str,
        to_project: &str,
        position: Option<i64>,
    ) -> Result<TaskList, AppError> {
        let from_project = self.task_list_project_id(id).await?;

        let mut tx = self.pool.begin().await?;
        relocate_list(&mut tx, id, &from_project, to_project, position).await?;
        tx.commit().await?;

        self.require_task_list(id).await
    }

    /// Strict reorder within the list's project.
    pub async fn reorder_task_list(&self, id: &str, new_position: i64) -> Result<TaskList, AppError> {
        let project_id = self.task_list_project_id(id).await?;

        let mut tx = self.pool.begin().await?;
        TASK_LISTS
            .reorder(&mut tx, &project_id, id, new_position)
            .await?;
        tx.commit().await?;

        self.require_task_list(id).await
    }

    /// Delete a list with its tasks, then close the gap in the project.
    ///
    /// Returns the ids of the deleted tasks.
    pub async fn delete_task_list(&self, id: &str) -> Result<Vec<String>, AppError> {
        let project_id = self.task_list_project_id(id).await?;

        let mut tx = self.pool.begin().await?;
        TASK_LISTS.prepare_remove(&mut tx, &project_id).await?;

        let position: i64 = sqlx::query("SELECT position FROM task_lists WHERE id = ? AND project_id = ?")
            .bind(id)
            .bind(&project_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task list {} not found", id)))?
            .get("position");

        let task_ids: Vec<String> = sqlx::query("SELECT id FROM tasks WHERE task_list_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();

        sqlx::query(
            "DELETE FROM task_comments WHERE task_id IN (SELECT id FROM tasks WHERE task_list_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM task_assignees WHERE task_id IN (SELECT id FROM tasks WHERE task_list_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM tasks WHERE task_list_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM task_lists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        TASK_LISTS.close_gap(&mut tx, &project_id, position).await?;
        tx.commit().await?;

        tracing::info!(task_list_id = %id, project_id = %project_id, "Task list deleted");
        Ok(task_ids)
    }
}

/// Strict move across projects. Assignees outside the new project are dropped.
async fn relocate_list(
    conn: &mut SqliteConnection,
    id: &str,
    from_project: &str,
    to_project: &str,
    position: Option<i64>,
) -> Result<i64, AppError> {
    let landed = TASK_LISTS
        .move_to_parent(conn, id, from_project, to_project, position)
        .await?;
    prune_assignees(conn, to_project).await?;

    tracing::info!(
        task_list_id = %id,
        from_project = %from_project,
        to_project = %to_project,
        position = landed,
        "Task list moved"
    );
    Ok(landed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{project, test_db, user};
    use crate::models::{CreateTaskRequest, MemberRole};

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;
        let bob = user(&db.repo, "bob@example.com").await;
        let board = project(&db.repo, &alice, "Board").await;
        let foreign = project(&db.repo, &bob, "Foreign").await;

        for name in ["To Do", "Doing", "Done"] {
            db.repo
                .create_task_list(&CreateTaskListRequest {
                    name: name.to_string(),
                    project: board.id.clone(),
                    position: None,
                })
                .await
                .unwrap();
        }
        db.repo
            .create_task_list(&CreateTaskListRequest {
                name: "Hidden".to_string(),
                project: foreign.id.clone(),
                position: None,
            })
            .await
            .unwrap();

        let mine = db
            .repo
            .list_task_lists(&alice.id, &TaskListQuery::default())
            .await
            .unwrap();
        let names: Vec<&str> = mine.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "Doing", "Done"]);

        let searched = db
            .repo
            .list_task_lists(
                &alice.id,
                &TaskListQuery {
                    search: Some("do".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.len(), 3);

        let done = db
            .repo
            .list_task_lists(
                &alice.id,
                &TaskListQuery {
                    search: Some("Done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.len(), 1);
    }

    #[tokio::test]
    async fn test_archive_via_update() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;
        let board = project(&db.repo, &alice, "Board").await;
        let list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "Old".to_string(),
                project: board.id.clone(),
                position: None,
            })
            .await
            .unwrap();

        let updated = db
            .repo
            .update_task_list(
                &list.id,
                &UpdateTaskListRequest {
                    is_archived: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_archived);
        assert_eq!(updated.name, "Old");
        assert_eq!(updated.tasks_count, 0);
    }

    #[tokio::test]
    async fn test_update_moves_renames_and_prunes_together() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;
        let bob = user(&db.repo, "bob@example.com").await;
        let board = project(&db.repo, &alice, "Board").await;
        let other = project(&db.repo, &alice, "Other").await;
        db.repo
            .add_member(&board.id, "bob@example.com", MemberRole::Editor, &alice.id)
            .await
            .unwrap();

        let list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "Sprint".to_string(),
                project: board.id.clone(),
                position: None,
            })
            .await
            .unwrap();
        let task = db
            .repo
            .create_task(
                &alice.id,
                &CreateTaskRequest {
                    title: "Pair".to_string(),
                    description: None,
                    task_list: list.id.clone(),
                    position: None,
                    priority: None,
                    label_color: None,
                    assignees: vec![alice.id.clone(), bob.id.clone()],
                    due_date: None,
                },
            )
            .await
            .unwrap();

        let updated = db
            .repo
            .update_task_list(
                &list.id,
                &UpdateTaskListRequest {
                    name: Some("Next sprint".to_string()),
                    project: Some(other.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.project_id, other.id);
        assert_eq!(updated.name, "Next sprint");
        assert_eq!(updated.position, 0);

        let task = db.repo.get_task(&task.id).await.unwrap().unwrap();
        let assignees: Vec<&str> = task.assignees.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(assignees, vec![alice.id.as_str()]);
    }

    #[tokio::test]
    async fn test_failed_move_leaves_list_untouched() {
        let db = test_db().await;
        let alice = user(&db.repo, "alice@example.com").await;
        let board = project(&db.repo, &alice, "Board").await;
        let list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "Stay".to_string(),
                project: board.id.clone(),
                position: None,
            })
            .await
            .unwrap();

        let err = db
            .repo
            .update_task_list(
                &list.id,
                &UpdateTaskListRequest {
                    name: Some("Renamed".to_string()),
                    project: Some("missing-project".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let list = db.repo.get_task_list(&list.id).await.unwrap().unwrap();
        assert_eq!(list.name, "Stay");
        assert_eq!(list.project_id, board.id);
    }
}
