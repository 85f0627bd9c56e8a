//! User and session-token persistence.

use chrono::{DateTime, Utc};
use sqlx::Row;

use super::repository::{new_id, user_from_row, USER_COLUMNS};
use super::Repository;
use crate::errors::AppError;
use crate::models::{UpdateProfileRequest, User};

impl Repository {
    /// Insert a new user. `email` must already be normalized.
    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AppError> {
        let id = new_id();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, bio, is_active, date_joined) VALUES (?, ?, ?, ?, ?, '', 1, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            if err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                return Err(AppError::Conflict(
                    "A user with this email already exists.".to_string(),
                ));
            }
            return Err(err.into());
        }

        tracing::info!(user_id = %id, "User registered");

        self.get_user(&id)
            .await?
            .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Look up a user by normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// A user together with the stored password hash, for credential checks.
    pub async fn get_user_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| (user_from_row(&row), row.get("password_hash"))))
    }

    pub async fn get_password_hash(&self, user_id: &str) -> Result<String, AppError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        Ok(row.get("password_hash"))
    }

    pub async fn set_password_hash(&self, user_id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn touch_last_login(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply a partial profile update and return the fresh user.
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let existing = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let first_name = request.first_name.as_ref().unwrap_or(&existing.first_name);
        let last_name = request.last_name.as_ref().unwrap_or(&existing.last_name);
        let bio = request.bio.as_ref().unwrap_or(&existing.bio);

        sqlx::query("UPDATE users SET first_name = ?, last_name = ?, bio = ? WHERE id = ?")
            .bind(first_name)
            .bind(last_name)
            .bind(bio)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = %user_id, "Profile updated");

        self.get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Record a refresh token id as revoked.
    ///
    /// Returns `false` when the id was already revoked, so exactly one caller
    /// wins for any given token.
    pub async fn revoke_token(
        &self,
        jti: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO revoked_tokens (jti, user_id, expires_at, revoked_at) VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        // Expired entries can no longer be replayed.
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
