//! # Notification Repository
//!
//! Stock and expiry warnings. A partial unique index keeps at most one
//! unread row per (type, product); raising an alert that already has an open
//! row refreshes that row in place.
//!
//! ```text
//! upsert(alert)
//!   INSERT ... ON CONFLICT (type, product_id) WHERE is_read = 0
//!   DO UPDATE SET message, product_name, meta_*, created_at
//!        │
//!        ├── no open row  → new notification
//!        └── open row     → same id, fresh message and metadata
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::alerts::Alert;
use pharmacy_core::{Notification, NotificationFilter};

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Stores `alert`, coalescing with the open notification for the same
    /// product and type.
    pub async fn upsert(&self, alert: &Alert) -> DbResult<Notification> {
        self.upsert_at(alert, Utc::now()).await
    }

    async fn upsert_at(&self, alert: &Alert, now: DateTime<Utc>) -> DbResult<Notification> {
        debug!(product_id = %alert.product_id, kind = ?alert.kind, "Raising notification");

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                id, type, message, product_id, product_name, is_read,
                meta_quantity, meta_expiring_date, meta_days_until_expiry,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
            ON CONFLICT (type, product_id) WHERE is_read = 0 DO UPDATE SET
                message = excluded.message,
                product_name = excluded.product_name,
                meta_quantity = excluded.meta_quantity,
                meta_expiring_date = excluded.meta_expiring_date,
                meta_days_until_expiry = excluded.meta_days_until_expiry,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(alert.kind)
        .bind(&alert.message)
        .bind(&alert.product_id)
        .bind(&alert.product_name)
        .bind(alert.metadata.quantity)
        .bind(alert.metadata.expiring_date)
        .bind(alert.metadata.days_until_expiry)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Notification>> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(notification)
    }

    /// Newest first, optionally only read or unread ones.
    pub async fn list(&self, filter: &NotificationFilter) -> DbResult<Vec<Notification>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM notifications");
        if let Some(is_read) = filter.is_read {
            query.push(" WHERE is_read = ").push_bind(is_read);
        }
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit());

        let notifications = query
            .build_query_as::<Notification>()
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE is_read = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Marks one notification read. Reading an already read notification
    /// keeps its original `read_at`.
    pub async fn mark_read(&self, id: &str) -> DbResult<Notification> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE notifications SET
                is_read = 1,
                read_at = COALESCE(read_at, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Notification", id))
    }

    /// Marks every unread notification read. Returns how many changed.
    pub async fn mark_all_read(&self) -> DbResult<u64> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ?, updated_at = ? WHERE is_read = 0",
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes read notifications created more than `days` days before
    /// `now`.
    pub async fn delete_old_read(&self, days: i64, now: DateTime<Utc>) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE is_read = 1 AND created_at < ?")
                .bind(now - Duration::days(days))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
