//! # Session Repository
//!
//! Server-side login sessions.
//!
//! ```text
//! login ──► invalidate_for_user(user) ──► create(user, ttl)  ── one live session
//!                                                                per user
//! request ──► find_valid(id, now) ── active && expires_at > now, touches
//!                                    last_activity
//! job ──► cleanup(now) ── deletes expired, inactive and id-less rows
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{Role, Session};

/// Client details recorded with a session.
#[derive(Debug, Clone, Default)]
pub struct SessionClient {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Opens a session lasting `ttl` from now.
    pub async fn create(
        &self,
        user_id: &str,
        role: Role,
        ttl: Duration,
        client: SessionClient,
    ) -> DbResult<Session> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(user_id = %user_id, "Opening session");

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, role, is_active, expires_at, user_agent, ip_address,
                last_activity, created_at, updated_at
            ) VALUES (?, ?, ?, 1, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(role)
        .bind(now + ttl)
        .bind(&client.user_agent)
        .bind(&client.ip_address)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", id))
    }

    async fn get(&self, id: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, role, is_active, expires_at, user_agent, ip_address,
                   last_activity, created_at
            FROM sessions WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Returns the session if it is active and unexpired at `now`, and
    /// records the activity.
    pub async fn find_valid(&self, id: &str, now: DateTime<Utc>) -> DbResult<Option<Session>> {
        if id.is_empty() {
            return Ok(None);
        }

        let touched = sqlx::query(
            "UPDATE sessions SET last_activity = ?, updated_at = ?
             WHERE id = ? AND is_active = 1 AND expires_at > ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if touched.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Marks one session inactive. Returns `false` if it was unknown or
    /// already inactive.
    pub async fn invalidate(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks every session of a user inactive.
    pub async fn invalidate_for_user(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = 0, updated_at = ? WHERE user_id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Deletes sessions that can never authenticate again.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE expires_at <= ? OR is_active = 0 OR id = ''",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use pharmacy_core::{NewUser, UserStatus};

    async fn user_id(db: &crate::Database) -> String {
        db.users()
            .create(NewUser {
                name: "Kofi".into(),
                username: "kofi".into(),
                password_hash: "x".into(),
                role: Role::Salesperson,
                status: UserStatus::Active,
                phone: None,
                balance_cents: 0,
                branch: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_lookup_fails_after_expiry() {
        let db = testing::db().await;
        let user = user_id(&db).await;
        let session = db
            .sessions()
            .create(&user, Role::Salesperson, Duration::hours(1), SessionClient::default())
            .await
            .unwrap();

        let now = Utc::now();
        assert!(db.sessions().find_valid(&session.id, now).await.unwrap().is_some());

        let later = now + Duration::hours(2);
        assert!(db.sessions().find_valid(&session.id, later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_fails_after_invalidation() {
        let db = testing::db().await;
        let user = user_id(&db).await;
        let sessions = db.sessions();
        let first = sessions
            .create(&user, Role::Salesperson, Duration::days(7), SessionClient::default())
            .await
            .unwrap();
        let second = sessions
            .create(&user, Role::Salesperson, Duration::days(7), SessionClient::default())
            .await
            .unwrap();

        assert!(sessions.invalidate(&first.id).await.unwrap());
        assert!(!sessions.invalidate(&first.id).await.unwrap());
        assert!(sessions.find_valid(&first.id, Utc::now()).await.unwrap().is_none());

        assert_eq!(sessions.invalidate_for_user(&user).await.unwrap(), 1);
        assert!(sessions.find_valid(&second.id, Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_valid_touches_last_activity() {
        let db = testing::db().await;
        let user = user_id(&db).await;
        let session = db
            .sessions()
            .create(&user, Role::Salesperson, Duration::days(1), SessionClient::default())
            .await
            .unwrap();

        let later = Utc::now() + Duration::minutes(5);
        let found = db.sessions().find_valid(&session.id, later).await.unwrap().unwrap();
        assert!(found.last_activity > session.last_activity);
        assert!(db.sessions().find_valid("", later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_removes_dead_sessions() {
        let db = testing::db().await;
        let user = user_id(&db).await;
        let sessions = db.sessions();
        let live = sessions
            .create(&user, Role::Salesperson, Duration::days(1), SessionClient::default())
            .await
            .unwrap();
        let dead = sessions
            .create(&user, Role::Salesperson, Duration::days(1), SessionClient::default())
            .await
            .unwrap();
        sessions
            .create(&user, Role::Salesperson, Duration::seconds(-10), SessionClient::default())
            .await
            .unwrap();
        sessions.invalidate(&dead.id).await.unwrap();

        assert_eq!(sessions.cleanup(Utc::now()).await.unwrap(), 2);
        assert!(sessions.find_valid(&live.id, Utc::now()).await.unwrap().is_some());
    }
}
