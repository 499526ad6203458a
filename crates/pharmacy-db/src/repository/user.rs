//! # User Repository
//!
//! Accounts for the back-office. Usernames are unique and stored lowercase;
//! callers normalise before writing.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{NewUser, User, UserUpdate};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user.
    ///
    /// ## Errors
    /// `UniqueViolation` on `users.username` when the name is taken.
    pub async fn create(&self, user: NewUser) -> DbResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, username = %user.username, role = %user.role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, username, password_hash, role, status,
                phone, balance_cents, branch, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.status)
        .bind(&user.phone)
        .bind(user.balance_cents)
        .bind(&user.branch)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Looks up by (already normalised) username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// All users, newest first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                username = COALESCE(?, username),
                phone = COALESCE(?, phone),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.username)
        .bind(&update.phone)
        .bind(&update.password_hash)
        .bind(update.role)
        .bind(update.status)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn record_login(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a user. Returns `false` when no such user existed.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
