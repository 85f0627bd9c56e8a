//! Positioned items within a parent: append, reorder, move across parents.
//!
//! Two policies share one engine:
//!
//! * [`OrderingPolicy::Strict`] keeps positions unique and dense per parent
//!   (`UNIQUE (parent, position)` in the schema). Every write starts by touching
//!   the parent row, so the transaction owns SQLite's write lock before it reads
//!   any position. Shifted rows are staged through negative positions because
//!   SQLite checks the unique constraint row by row during an `UPDATE`.
//! * [`OrderingPolicy::Relaxed`] treats positions as ordering hints. New items get
//!   a time-derived position, collisions are allowed, and readers break ties on
//!   `created_at`. No parent lock is taken; instead the transaction's first
//!   statement writes the item itself (new rows are inserted at
//!   [`PARKED_POSITION`] and placed afterwards).
//!
//! A deferred SQLite transaction that reads before it writes fails with
//! `SQLITE_BUSY` when another writer commits in between, so every path here
//! opens with a write.
//!
//! Callers own the transaction; every method takes the transaction's connection.

use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use crate::errors::AppError;

/// Slot an item occupies while its neighbours are being shifted, or before a new
/// relaxed item is placed. Parked rows are not counted as siblings.
pub const PARKED_POSITION: i64 = -1;
/// Staged rows live at `-position - STAGE_OFFSET`, strictly below the parked slot.
const STAGE_OFFSET: i64 = 3;
/// Modulus for the time component of relaxed positions.
const RELAXED_TIME_MODULUS: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingPolicy {
    Strict,
    Relaxed,
}

/// A table of positioned rows grouped under a parent table.
#[derive(Debug, Clone, Copy)]
pub struct OrderedCollection {
    table: &'static str,
    parent_column: &'static str,
    parent_table: &'static str,
    policy: OrderingPolicy,
}

/// Task lists under a project: strict.
pub const TASK_LISTS: OrderedCollection = OrderedCollection {
    table: "task_lists",
    parent_column: "project_id",
    parent_table: "projects",
    policy: OrderingPolicy::Strict,
};

/// Tasks under a task list: relaxed.
pub const TASKS: OrderedCollection = OrderedCollection {
    table: "tasks",
    parent_column: "task_list_id",
    parent_table: "task_lists",
    policy: OrderingPolicy::Relaxed,
};

/// Position for a new relaxed item when the caller gave none.
///
/// The time component keeps successive appends increasing without reading
/// every sibling; when it would not land after the current maximum (clock
/// wrap, explicit large positions) the item goes to `max + 1` instead.
pub fn relaxed_position(unix_secs: i64, sibling_count: i64, max_position: Option<i64>) -> i64 {
    let candidate = unix_secs.rem_euclid(RELAXED_TIME_MODULUS) + sibling_count;
    match max_position {
        Some(max) if candidate <= max => max + 1,
        _ => candidate,
    }
}

/// Clamp a strict reorder target to the last occupied slot.
pub fn clamp_strict(new_position: i64, sibling_count: i64) -> i64 {
    new_position.clamp(0, (sibling_count - 1).max(0))
}

impl OrderedCollection {
    /// Position for a new item under `parent_id`.
    ///
    /// Strict collections clamp an explicit position into `0..=count` and open a
    /// slot there; without one the item goes last. Relaxed collections honour an
    /// explicit position as given.
    pub async fn append_position(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        explicit: Option<i64>,
    ) -> Result<i64, AppError> {
        if self.policy == OrderingPolicy::Strict {
            self.lock_parent(conn, parent_id).await?;
        }

        let (count, max) = self.stats(conn, parent_id).await?;
        match (self.policy, explicit) {
            (OrderingPolicy::Strict, Some(position)) => {
                let target = position.clamp(0, count);
                self.shift(conn, parent_id, target, i64::MAX, 1).await?;
                Ok(target)
            }
            (OrderingPolicy::Strict, None) => Ok(count),
            (OrderingPolicy::Relaxed, Some(position)) => Ok(position),
            (OrderingPolicy::Relaxed, None) => {
                Ok(relaxed_position(Utc::now().timestamp(), count, max))
            }
        }
    }

    /// Give a row inserted at [`PARKED_POSITION`] its final position.
    pub async fn place(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        item_id: &str,
        explicit: Option<i64>,
    ) -> Result<i64, AppError> {
        let position = self.append_position(conn, parent_id, explicit).await?;
        self.set_position(conn, item_id, position).await?;
        Ok(position)
    }

    /// Move `item_id` to `new_position` within `parent_id` and return the position it landed on.
    ///
    /// Items between the old and new slot shift by one towards the vacated slot.
    pub async fn reorder(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        item_id: &str,
        new_position: i64,
    ) -> Result<i64, AppError> {
        match self.policy {
            OrderingPolicy::Strict => self.lock_parent(conn, parent_id).await?,
            OrderingPolicy::Relaxed => self.touch_item(conn, parent_id, item_id).await?,
        }

        let current = self.current_position(conn, parent_id, item_id).await?;
        let (count, max) = self.stats(conn, parent_id).await?;
        let target = match self.policy {
            OrderingPolicy::Strict => clamp_strict(new_position, count),
            OrderingPolicy::Relaxed => new_position.min(max.unwrap_or(current)).max(0),
        };

        if target == current {
            return Ok(current);
        }

        if self.policy == OrderingPolicy::Strict {
            self.set_position(conn, item_id, PARKED_POSITION).await?;
        }
        if target < current {
            self.shift(conn, parent_id, target, current - 1, 1).await?;
        } else {
            self.shift(conn, parent_id, current + 1, target, -1).await?;
        }
        self.set_position(conn, item_id, target).await?;

        tracing::debug!(
            table = self.table,
            item_id = %item_id,
            from = current,
            to = target,
            "Reordered item"
        );
        Ok(target)
    }

    /// Move `item_id` from `from_parent` into `to_parent`, returning its new position.
    ///
    /// Strict collections close the gap in the old parent and open one in the new
    /// parent (appending when no position is given). Relaxed collections only
    /// reassign parent and position.
    pub async fn move_to_parent(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        from_parent: &str,
        to_parent: &str,
        new_position: Option<i64>,
    ) -> Result<i64, AppError> {
        if from_parent == to_parent {
            return match new_position {
                Some(position) => self.reorder(conn, from_parent, item_id, position).await,
                None => self.current_position(conn, from_parent, item_id).await,
            };
        }

        match self.policy {
            OrderingPolicy::Strict => {
                self.lock_parent(conn, from_parent).await?;
                self.lock_parent(conn, to_parent).await?;

                let old = self.current_position(conn, from_parent, item_id).await?;
                sqlx::query(&format!(
                    "UPDATE {} SET {} = ?, position = ? WHERE id = ?",
                    self.table, self.parent_column
                ))
                .bind(to_parent)
                .bind(PARKED_POSITION)
                .bind(item_id)
                .execute(&mut *conn)
                .await?;
                self.shift(conn, from_parent, old + 1, i64::MAX, -1).await?;

                // The parked item is not counted among the destination's siblings.
                let (count, _) = self.stats(conn, to_parent).await?;
                let target = new_position.map_or(count, |p| p.clamp(0, count));
                self.shift(conn, to_parent, target, i64::MAX, 1).await?;
                self.set_position(conn, item_id, target).await?;
                Ok(target)
            }
            OrderingPolicy::Relaxed => {
                let result = sqlx::query(&format!(
                    "UPDATE {} SET {} = ?, position = ?, updated_at = ? WHERE id = ? AND {} = ?",
                    self.table, self.parent_column, self.parent_column
                ))
                .bind(to_parent)
                .bind(PARKED_POSITION)
                .bind(Utc::now())
                .bind(item_id)
                .bind(from_parent)
                .execute(&mut *conn)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound(format!("Item {} not found", item_id)));
                }
                self.place(conn, to_parent, item_id, new_position).await
            }
        }
    }

    /// Take the parent's write lock ahead of removing an item at `position`.
    pub async fn prepare_remove(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
    ) -> Result<(), AppError> {
        if self.policy == OrderingPolicy::Strict {
            self.lock_parent(conn, parent_id).await?;
        }
        Ok(())
    }

    /// Close the gap left by an item removed from `position`. Relaxed collections keep gaps.
    pub async fn close_gap(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        position: i64,
    ) -> Result<(), AppError> {
        if self.policy == OrderingPolicy::Strict {
            self.shift(conn, parent_id, position + 1, i64::MAX, -1).await?;
        }
        Ok(())
    }

    /// Sibling ids in display order.
    #[cfg(test)]
    pub async fn ordered_ids(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
    ) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT id, position FROM {} WHERE {} = ? ORDER BY position, created_at",
            self.table, self.parent_column
        ))
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("position")))
            .collect())
    }

    /// Write to the parent row so the transaction holds the write lock before any read.
    async fn lock_parent(&self, conn: &mut SqliteConnection, parent_id: &str) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET updated_at = ? WHERE id = ?",
            self.parent_table
        ))
        .bind(Utc::now())
        .bind(parent_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Parent {} not found", parent_id)));
        }
        Ok(())
    }

    /// Open the transaction with a write on the item itself.
    async fn touch_item(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        item_id: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET updated_at = ? WHERE id = ? AND {} = ?",
            self.table, self.parent_column
        ))
        .bind(Utc::now())
        .bind(item_id)
        .bind(parent_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }
        Ok(())
    }

    /// Sibling count and highest position, ignoring a parked item.
    async fn stats(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
    ) -> Result<(i64, Option<i64>), AppError> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count, MAX(position) AS max_position FROM {} WHERE {} = ? AND position >= 0",
            self.table, self.parent_column
        ))
        .bind(parent_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok((row.get("count"), row.get("max_position")))
    }

    async fn current_position(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        item_id: &str,
    ) -> Result<i64, AppError> {
        let row = sqlx::query(&format!(
            "SELECT position FROM {} WHERE id = ? AND {} = ?",
            self.table, self.parent_column
        ))
        .bind(item_id)
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

        Ok(row.get("position"))
    }

    async fn set_position(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        position: i64,
    ) -> Result<(), AppError> {
        sqlx::query(&format!(
            "UPDATE {} SET position = ?, updated_at = ? WHERE id = ?",
            self.table
        ))
        .bind(position)
        .bind(Utc::now())
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Add `delta` to every position in `[low, high]` under `parent_id`.
    async fn shift(
        &self,
        conn: &mut SqliteConnection,
        parent_id: &str,
        low: i64,
        high: i64,
        delta: i64,
    ) -> Result<(), AppError> {
        if low > high {
            return Ok(());
        }

        match self.policy {
            OrderingPolicy::Strict => {
                sqlx::query(&format!(
                    "UPDATE {} SET position = -position - ? WHERE {} = ? AND position >= ? AND position <= ?",
                    self.table, self.parent_column
                ))
                .bind(STAGE_OFFSET)
                .bind(parent_id)
                .bind(low.max(0))
                .bind(high)
                .execute(&mut *conn)
                .await?;

                sqlx::query(&format!(
                    "UPDATE {} SET position = -position - ? + ? WHERE {} = ? AND position <= ?",
                    self.table, self.parent_column
                ))
                .bind(STAGE_OFFSET)
                .bind(delta)
                .bind(parent_id)
                .bind(-STAGE_OFFSET)
                .execute(&mut *conn)
                .await?;
            }
            OrderingPolicy::Relaxed => {
                sqlx::query(&format!(
                    "UPDATE {} SET position = position + ? WHERE {} = ? AND position >= ? AND position <= ?",
                    self.table, self.parent_column
                ))
                .bind(delta)
                .bind(parent_id)
                .bind(low)
                .bind(high)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }
}
