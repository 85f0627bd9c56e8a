//! Database repository shared by the per-aggregate `impl` blocks.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{
    full_name, is_overdue, Comment, MemberRole, Membership, Priority, Project, Task, TaskList,
    User, UserSummary, Visibility,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(super) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Column lists joined with the display fields the API returns.

pub(super) const USER_COLUMNS: &str =
    "id, email, first_name, last_name, bio, is_active, date_joined, last_login";

pub(super) const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.owner_id, o.email AS owner_email,
           p.is_private, p.is_archived, p.background_color, p.background_image,
           p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM project_memberships m WHERE m.project_id = p.id) + 1
               AS members_count
    FROM projects p
    JOIN users o ON o.id = p.owner_id"#;

pub(super) const MEMBERSHIP_SELECT: &str = r#"
    SELECT m.id, m.project_id, m.user_id, u.email, u.first_name, u.last_name, m.role,
           m.invited_by, i.email AS invited_by_email, m.joined_at
    FROM project_memberships m
    JOIN users u ON u.id = m.user_id
    LEFT JOIN users i ON i.id = m.invited_by"#;

pub(super) const TASK_LIST_SELECT: &str = r#"
    SELECT l.id, l.name, l.project_id, p.name AS project_name, l.position, l.is_archived,
           l.created_at, l.updated_at,
           (SELECT COUNT(*) FROM tasks t WHERE t.task_list_id = l.id AND t.is_archived = 0)
               AS tasks_count
    FROM task_lists l
    JOIN projects p ON p.id = l.project_id"#;

pub(super) const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.task_list_id, l.name AS task_list_name,
           l.project_id, p.name AS project_name, t.position, t.priority, t.label_color,
           t.creator_id, c.email AS creator_email, t.due_date, t.is_completed,
           t.completed_at, t.is_archived, t.created_at, t.updated_at
    FROM tasks t
    JOIN task_lists l ON l.id = t.task_list_id
    JOIN projects p ON p.id = l.project_id
    JOIN users c ON c.id = t.creator_id"#;

pub(super) const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.task_id, c.author_id, u.email AS author_email, u.first_name AS author_first_name,
           c.content, c.is_edited, c.created_at, c.updated_at
    FROM task_comments c
    JOIN users u ON u.id = c.author_id"#;

// Helper functions for row conversion

pub(super) fn user_from_row(row: &SqliteRow) -> User {
    let first_name: String = row.get("first_name");
    let last_name: String = row.get("last_name");
    User {
        id: row.get("id"),
        email: row.get("email"),
        full_name: full_name(&first_name, &last_name),
        first_name,
        last_name,
        bio: row.get("bio"),
        is_active: row.get("is_active"),
        date_joined: row.get("date_joined"),
        last_login: row.get("last_login"),
    }
}

pub(super) fn project_from_row(row: &SqliteRow) -> Project {
    let is_private: bool = row.get("is_private");
    Project {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        owner_id: row.get("owner_id"),
        owner_email: row.get("owner_email"),
        visibility: Visibility::from_private_flag(is_private),
        is_archived: row.get("is_archived"),
        background_color: row.get("background_color"),
        background_image: row.get("background_image"),
        members_count: row.get("members_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) fn membership_from_row(row: &SqliteRow) -> Membership {
    let role: String = row.get("role");
    Membership {
        id: row.get("id"),
        project_id: row.get("project_id"),
        user_id: row.get("user_id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        // The CHECK constraint keeps unknown roles out of the table.
        role: MemberRole::parse(&role).unwrap_or_default(),
        invited_by: row.get("invited_by"),
        invited_by_email: row.get("invited_by_email"),
        joined_at: row.get("joined_at"),
    }
}

pub(super) fn task_list_from_row(row: &SqliteRow) -> TaskList {
    TaskList {
        id: row.get("id"),
        name: row.get("name"),
        project_id: row.get("project_id"),
        project_name: row.get("project_name"),
        position: row.get("position"),
        is_archived: row.get("is_archived"),
        tasks_count: row.get("tasks_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Build a task without its assignees; callers attach them afterwards.
pub(super) fn task_from_row(row: &SqliteRow, now: DateTime<Utc>) -> Task {
    let priority: String = row.get("priority");
    let due_date: Option<DateTime<Utc>> = row.get("due_date");
    let is_completed: bool = row.get("is_completed");
    Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        task_list_id: row.get("task_list_id"),
        task_list_name: row.get("task_list_name"),
        project_id: row.get("project_id"),
        project_name: row.get("project_name"),
        position: row.get("position"),
        priority: Priority::parse(&priority).unwrap_or_default(),
        label_color: row.get("label_color"),
        assignees: Vec::new(),
        assignees_count: 0,
        creator_id: row.get("creator_id"),
        creator_email: row.get("creator_email"),
        due_date,
        is_completed,
        is_archived: row.get("is_archived"),
        is_overdue: is_overdue(due_date, is_completed, now),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) fn comment_from_row(row: &SqliteRow) -> Comment {
    let author_first_name: String = row.get("author_first_name");
    let author = UserSummary::new(
        row.get("author_id"),
        row.get("author_email"),
        &author_first_name,
    );
    Comment {
        id: row.get("id"),
        task_id: row.get("task_id"),
        author_id: author.id,
        author_email: author.email,
        author_name: author.name,
        content: row.get("content"),
        is_edited: row.get("is_edited"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) fn user_summary_from_row(row: &SqliteRow) -> UserSummary {
    let first_name: String = row.get("first_name");
    UserSummary::new(row.get("id"), row.get("email"), &first_name)
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
pub(super) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
