//! Task persistence: cards, assignees and bulk updates.
//!
//! Positions go through the relaxed ordering engine.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::ordering::{PARKED_POSITION, TASKS};
use super::repository::{like_pattern, new_id, task_from_row, user_summary_from_row, TASK_SELECT};
use super::Repository;
use crate::errors::{AppError, ValidationErrors};
use crate::models::{
    derive_completed_at, BulkAction, CreateTaskRequest, Priority, Task, TaskDetail, TaskQuery,
    UpdateTaskRequest, UserSummary,
};

impl Repository {
    /// Tasks in projects the caller owns or belongs to, in board order.
    pub async fn list_tasks(&self, user_id: &str, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(TASK_SELECT);
        builder
            .push(" WHERE (p.owner_id = ")
            .push_bind(user_id.to_string())
            .push(" OR EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ")
            .push_bind(user_id.to_string())
            .push("))");
        if let Some(list_id) = &query.task_list {
            builder.push(" AND t.task_list_id = ").push_bind(list_id.clone());
        }
        self.fetch_tasks(builder, query).await
    }

    /// The ids among `ids` whose project the caller may view. Unknown ids are dropped.
    pub async fn viewable_task_ids(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"SELECT t.id FROM tasks t
               JOIN task_lists l ON l.id = t.task_list_id
               JOIN projects p ON p.id = l.project_id
               WHERE t.id IN ("#,
        );
        let mut ids_list = builder.separated(", ");
        for id in ids {
            ids_list.push_bind(id.clone());
        }
        ids_list.push_unseparated(")");
        builder
            .push(" AND (p.is_private = 0 OR p.owner_id = ")
            .push_bind(user_id.to_string())
            .push(" OR EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ")
            .push_bind(user_id.to_string())
            .push("))");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    /// Tasks of one list, in board order. View access is checked by the caller.
    pub async fn list_tasks_in_list(
        &self,
        task_list_id: &str,
        query: &TaskQuery,
    ) -> Result<Vec<Task>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(TASK_SELECT);
        builder
            .push(" WHERE t.task_list_id = ")
            .push_bind(task_list_id.to_string());
        self.fetch_tasks(builder, query).await
    }

    async fn fetch_tasks(
        &self,
        mut builder: QueryBuilder<'_, Sqlite>,
        query: &TaskQuery,
    ) -> Result<Vec<Task>, AppError> {
        if let Some(archived) = query.archived {
            builder.push(" AND t.is_archived = ").push_bind(archived);
        }
        if let Some(completed) = query.completed {
            builder.push(" AND t.is_completed = ").push_bind(completed);
        }
        if let Some(priority) = query.priority {
            builder.push(" AND t.priority = ").push_bind(priority.as_str());
        }
        if let Some(creator) = &query.creator {
            builder.push(" AND t.creator_id = ").push_bind(creator.clone());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            builder
                .push(" AND (t.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR t.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        builder.push(" ORDER BY t.position, t.created_at");

        let now = Utc::now();
        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut tasks: Vec<Task> = rows.iter().map(|row| task_from_row(row, now)).collect();
        for task in &mut tasks {
            self.attach_assignees(task).await?;
        }
        Ok(tasks)
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(&format!("{} WHERE t.id = ?", TASK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut task = task_from_row(&row, Utc::now());
                self.attach_assignees(&mut task).await?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn require_task(&self, id: &str) -> Result<Task, AppError> {
        self.get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    /// Task with its comment thread, oldest comment first.
    pub async fn get_task_detail(&self, id: &str) -> Result<TaskDetail, AppError> {
        let task = self.require_task(id).await?;
        let comments = self.list_comments(id).await?;
        Ok(TaskDetail { task, comments })
    }

    async fn attach_assignees(&self, task: &mut Task) -> Result<(), AppError> {
        let rows = sqlx::query(
            r#"SELECT u.id, u.email, u.first_name FROM task_assignees a
               JOIN users u ON u.id = a.user_id
               WHERE a.task_id = ?
               ORDER BY u.email"#,
        )
        .bind(&task.id)
        .fetch_all(&self.pool)
        .await?;

        let assignees: Vec<UserSummary> = rows.iter().map(user_summary_from_row).collect();
        task.assignees_count = assignees.len();
        task.assignees = assignees;
        Ok(())
    }

    /// Every assignee must be the owner or a member of the project.
    async fn check_assignees(&self, project_id: &str, assignees: &[String]) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();
        for user_id in assignees {
            if !self.is_participant(project_id, user_id).await? {
                errors.add(
                    "assignees",
                    format!("User {} is not a member of this project.", user_id),
                );
            }
        }
        errors.into_result()
    }

    /// Create a task in `request.task_list`, appended unless a position is given.
    pub async fn create_task(
        &self,
        creator_id: &str,
        request: &CreateTaskRequest,
    ) -> Result<Task, AppError> {
        let project_id = self.task_list_project_id(&request.task_list).await?;
        self.check_assignees(&project_id, &request.assignees).await?;

        let id = new_id();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO tasks
               (id, title, description, task_list_id, position, priority, label_color, creator_id,
                due_date, is_completed, completed_at, is_archived, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, 0, ?, ?)"#,
        )
        .bind(&id)
        .bind(request.title.trim())
        .bind(request.description.as_deref().unwrap_or_default())
        .bind(&request.task_list)
        .bind(PARKED_POSITION)
        .bind(request.priority.unwrap_or_default().as_str())
        .bind(&request.label_color)
        .bind(creator_id)
        .bind(request.due_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let position = TASKS
            .place(&mut tx, &request.task_list, &id, request.position)
            .await?;

        replace_assignees(&mut tx, &id, &request.assignees).await?;
        tx.commit().await?;

        tracing::info!(task_id = %id, task_list_id = %request.task_list, position, "Task created");
        self.require_task(&id).await
    }

    /// Apply a partial update, re-deriving `completed_at` from the completion flag.
    pub async fn update_task(&self, id: &str, request: &UpdateTaskRequest) -> Result<Task, AppError> {
        let existing = self.require_task(id).await?;
        if let Some(assignees) = &request.assignees {
            self.check_assignees(&existing.project_id, assignees).await?;
        }

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.title);
        let description = request.description.as_ref().unwrap_or(&existing.description);
        let priority: Priority = request.priority.unwrap_or(existing.priority);
        let label_color = match &request.label_color {
            Some(color) => color.clone(),
            None => existing.label_color.clone(),
        };
        let due_date = match request.due_date {
            Some(due) => due,
            None => existing.due_date,
        };
        let is_completed = request.is_completed.unwrap_or(existing.is_completed);
        let is_archived = request.is_archived.unwrap_or(existing.is_archived);
        let now = Utc::now();
        let completed_at = derive_completed_at(is_completed, existing.completed_at, now);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE tasks SET title = ?, description = ?, priority = ?, label_color = ?,
                   due_date = ?, is_completed = ?, completed_at = ?, is_archived = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(title)
        .bind(description)
        .bind(priority.as_str())
        .bind(&label_color)
        .bind(due_date)
        .bind(is_completed)
        .bind(completed_at)
        .bind(is_archived)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(assignees) = &request.assignees {
            replace_assignees(&mut tx, id, assignees).await?;
        }
        tx.commit().await?;

        tracing::info!(task_id = %id, "Task updated");
        self.require_task(id).await
    }

    /// Set the completion flag. Repeating the same value keeps the original `completed_at`.
    pub async fn set_task_completed(&self, id: &str, is_completed: bool) -> Result<Task, AppError> {
        let existing = self.require_task(id).await?;
        let now = Utc::now();
        let completed_at = derive_completed_at(is_completed, existing.completed_at, now);

        sqlx::query("UPDATE tasks SET is_completed = ?, completed_at = ?, updated_at = ? WHERE id = ?")
            .bind(is_completed)
            .bind(completed_at)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(task_id = %id, is_completed, "Task completion set");
        self.require_task(id).await
    }

    pub async fn set_task_archived(&self, id: &str, is_archived: bool) -> Result<Task, AppError> {
        let result = sqlx::query("UPDATE tasks SET is_archived = ?, updated_at = ? WHERE id = ?")
            .bind(is_archived)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        tracing::info!(task_id = %id, is_archived, "Task archive flag set");
        self.require_task(id).await
    }

    /// Reorder within the current list, or move to `target_list`.
    pub async fn move_task(
        &self,
        id: &str,
        target_list: Option<&str>,
        new_position: Option<i64>,
    ) -> Result<Task, AppError> {
        let existing = self.require_task(id).await?;
        let to_list = target_list.unwrap_or(&existing.task_list_id);
        let to_project = if to_list == existing.task_list_id {
            existing.project_id.clone()
        } else {
            self.task_list_project_id(to_list).await?
        };

        let mut tx = self.pool.begin().await?;
        let landed = TASKS
            .move_to_parent(&mut tx, id, &existing.task_list_id, to_list, new_position)
            .await?;
        if to_project != existing.project_id {
            prune_assignees(&mut tx, &to_project).await?;
        }
        tx.commit().await?;

        tracing::info!(
            task_id = %id,
            from_list = %existing.task_list_id,
            to_list = %to_list,
            position = landed,
            "Task moved"
        );
        self.require_task(id).await
    }

    /// Delete a task with its comments and assignee links.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM task_comments WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }
        tx.commit().await?;

        tracing::info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Apply one action to every task in a single transaction.
    ///
    /// Existence and permissions are checked by the caller before this runs.
    pub async fn bulk_update_tasks(
        &self,
        task_ids: &[String],
        action: BulkAction,
    ) -> Result<Vec<Task>, AppError> {
        let sql = match action {
            BulkAction::Complete => {
                "UPDATE tasks SET is_completed = 1, completed_at = COALESCE(completed_at, ?1), updated_at = ?1 WHERE id = ?2"
            }
            BulkAction::Incomplete => {
                "UPDATE tasks SET is_completed = 0, completed_at = NULL, updated_at = ?1 WHERE id = ?2"
            }
            BulkAction::Archive => "UPDATE tasks SET is_archived = 1, updated_at = ?1 WHERE id = ?2",
            BulkAction::Unarchive => "UPDATE tasks SET is_archived = 0, updated_at = ?1 WHERE id = ?2",
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for task_id in task_ids {
            let result = sqlx::query(sql)
                .bind(now)
                .bind(task_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!("Task {} not found", task_id)));
            }
        }
        tx.commit().await?;

        tracing::info!(count = task_ids.len(), action = ?action, "Bulk task update");

        let mut tasks = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            tasks.push(self.require_task(task_id).await?);
        }
        Ok(tasks)
    }

    /// Ids of every task, for rebuilding the search index.
    pub async fn all_task_ids(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT id FROM tasks ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

/// Drop assignees who are neither owner nor member of `project_id`.
///
/// Runs after anything that moves tasks into the project or shrinks its roster.
pub(super) async fn prune_assignees(
    conn: &mut SqliteConnection,
    project_id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"DELETE FROM task_assignees WHERE rowid IN (
               SELECT a.rowid FROM task_assignees a
               JOIN tasks t ON t.id = a.task_id
               JOIN task_lists l ON l.id = t.task_list_id
               JOIN projects p ON p.id = l.project_id
               WHERE p.id = ?1
                 AND a.user_id <> p.owner_id
                 AND NOT EXISTS (SELECT 1 FROM project_memberships m
                                 WHERE m.project_id = p.id AND m.user_id = a.user_id))"#,
    )
    .bind(project_id)
    .execute(&mut *conn)
    .await?;

    let pruned = result.rows_affected();
    if pruned > 0 {
        tracing::info!(project_id = %project_id, pruned, "Dropped assignees outside the project");
    }
    Ok(pruned)
}

async fn replace_assignees(
    conn: &mut SqliteConnection,
    task_id: &str,
    assignees: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    for user_id in assignees {
        sqlx::query("INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{project, test_db, user, TestDb};
    use crate::models::{CreateTaskListRequest, MemberRole, User};

    struct Board {
        owner: User,
        list_id: String,
    }

    async fn board(db: &TestDb) -> Board {
        let owner = user(&db.repo, "owner@example.com").await;
        let project = project(&db.repo, &owner, "Board").await;
        let list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "To Do".to_string(),
                project: project.id.clone(),
                position: None,
            })
            .await
            .unwrap();
        Board {
            owner,
            list_id: list.id,
        }
    }

    fn new_task(list_id: &str, title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: None,
            task_list: list_id.to_string(),
            position: None,
            priority: None,
            label_color: None,
            assignees: Vec::new(),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let db = test_db().await;
        let board = board(&db).await;

        let task = db
            .repo
            .create_task(&board.owner.id, &new_task(&board.list_id, "Write docs"))
            .await
            .unwrap();

        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.creator_id, board.owner.id);
        assert_eq!(task.creator_email, "owner@example.com");
        assert_eq!(task.task_list_name, "To Do");
        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());
        assert!(!task.is_overdue);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let db = test_db().await;
        let board = board(&db).await;
        let task = db
            .repo
            .create_task(&board.owner.id, &new_task(&board.list_id, "Ship"))
            .await
            .unwrap();

        let first = db.repo.set_task_completed(&task.id, true).await.unwrap();
        let stamp = first.completed_at.unwrap();
        let second = db.repo.set_task_completed(&task.id, true).await.unwrap();
        assert_eq!(second.completed_at, Some(stamp));

        let reopened = db.repo.set_task_completed(&task.id, false).await.unwrap();
        assert!(!reopened.is_completed);
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_update_rederives_completed_at() {
        let db = test_db().await;
        let board = board(&db).await;
        let task = db
            .repo
            .create_task(&board.owner.id, &new_task(&board.list_id, "Ship"))
            .await
            .unwrap();

        let done = db
            .repo
            .update_task(
                &task.id,
                &UpdateTaskRequest {
                    is_completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let renamed = db
            .repo
            .update_task(
                &task.id,
                &UpdateTaskRequest {
                    title: Some("Ship it".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.completed_at, done.completed_at);
    }

    #[tokio::test]
    async fn test_overdue_is_derived() {
        let db = test_db().await;
        let board = board(&db).await;
        let mut request = new_task(&board.list_id, "Late");
        request.due_date = Some(Utc::now() - chrono::Duration::days(1));

        let task = db.repo.create_task(&board.owner.id, &request).await.unwrap();
        assert!(task.is_overdue);

        let done = db.repo.set_task_completed(&task.id, true).await.unwrap();
        assert!(!done.is_overdue);
    }

    #[tokio::test]
    async fn test_assignees_must_participate() {
        let db = test_db().await;
        let board = board(&db).await;
        let member = user(&db.repo, "member@example.com").await;
        let outsider = user(&db.repo, "outsider@example.com").await;
        let project_id = db.repo.task_list_project_id(&board.list_id).await.unwrap();
        db.repo
            .add_member(&project_id, "member@example.com", MemberRole::Editor, &board.owner.id)
            .await
            .unwrap();

        let mut request = new_task(&board.list_id, "Pair up");
        request.assignees = vec![board.owner.id.clone(), member.id.clone()];
        let task = db.repo.create_task(&board.owner.id, &request).await.unwrap();
        assert_eq!(task.assignees_count, 2);

        request.assignees = vec![outsider.id.clone()];
        let err = db.repo.create_task(&board.owner.id, &request).await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.has("assignees")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_viewable_task_ids_follow_membership() {
        let db = test_db().await;
        let board = board(&db).await;
        let outsider = user(&db.repo, "outsider@example.com").await;
        let task = db
            .repo
            .create_task(&board.owner.id, &new_task(&board.list_id, "Private card"))
            .await
            .unwrap();
        let ids = vec![task.id.clone(), "no-such-task".to_string()];

        let owned = db.repo.viewable_task_ids(&board.owner.id, &ids).await.unwrap();
        assert_eq!(owned, HashSet::from([task.id.clone()]));
        assert!(db.repo.viewable_task_ids(&outsider.id, &ids).await.unwrap().is_empty());

        let project_id = db.repo.task_list_project_id(&board.list_id).await.unwrap();
        db.repo
            .add_member(&project_id, "outsider@example.com", MemberRole::Viewer, &board.owner.id)
            .await
            .unwrap();
        assert!(db
            .repo
            .viewable_task_ids(&outsider.id, &ids)
            .await
            .unwrap()
            .contains(&task.id));
        assert!(db.repo.viewable_task_ids(&outsider.id, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_move_to_other_project_drops_outside_assignees() {
        let db = test_db().await;
        let board = board(&db).await;
        let member = user(&db.repo, "member@example.com").await;
        let project_id = db.repo.task_list_project_id(&board.list_id).await.unwrap();
        db.repo
            .add_member(&project_id, "member@example.com", MemberRole::Editor, &board.owner.id)
            .await
            .unwrap();

        let other = project(&db.repo, &board.owner, "Other").await;
        let other_list = db
            .repo
            .create_task_list(&CreateTaskListRequest {
                name: "Inbox".to_string(),
                project: other.id.clone(),
                position: None,
            })
            .await
            .unwrap();

        let mut request = new_task(&board.list_id, "Hand over");
        request.assignees = vec![board.owner.id.clone(), member.id.clone()];
        let task = db.repo.create_task(&board.owner.id, &request).await.unwrap();
        assert_eq!(task.assignees_count, 2);

        let moved = db
            .repo
            .move_task(&task.id, Some(other_list.id.as_str()), None)
            .await
            .unwrap();
        assert_eq!(moved.project_id, other.id);
        assert_eq!(moved.assignees_count, 1);
        assert_eq!(moved.assignees[0].id, board.owner.id);
    }

    #[tokio::test]
    async fn test_removed_member_loses_assignments() {
        let db = test_db().await;
        let board = board(&db).await;
        let member = user(&db.repo, "member@example.com").await;
        let project_id = db.repo.task_list_project_id(&board.list_id).await.unwrap();
        db.repo
            .add_member(&project_id, "member@example.com", MemberRole::Editor, &board.owner.id)
            .await
            .unwrap();

        let mut request = new_task(&board.list_id, "Review");
        request.assignees = vec![member.id.clone()];
        let task = db.repo.create_task(&board.owner.id, &request).await.unwrap();

        db.repo.remove_member(&project_id, &member.id).await.unwrap();

        let task = db.repo.get_task(&task.id).await.unwrap().unwrap();
        assert!(task.assignees.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_update_and_filters() {
        let db = test_db().await;
        let board = board(&db).await;
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            ids.push(
                db.repo
                    .create_task(&board.owner.id, &new_task(&board.list_id, title))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let updated = db
            .repo
            .bulk_update_tasks(&ids[..2], BulkAction::Complete)
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|t| t.is_completed && t.completed_at.is_some()));

        let completed = db
            .repo
            .list_tasks(
                &board.owner.id,
                &TaskQuery {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 2);

        let searched = db
            .repo
            .list_tasks(
                &board.owner.id,
                &TaskQuery {
                    search: Some("thr".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].id, ids[2]);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let db = test_db().await;
        let board = board(&db).await;
        let task = db
            .repo
            .create_task(&board.owner.id, &new_task(&board.list_id, "Gone"))
            .await
            .unwrap();

        db.repo.delete_task(&task.id).await.unwrap();
        assert!(db.repo.get_task(&task.id).await.unwrap().is_none());
        assert!(matches!(
            db.repo.delete_task(&task.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
