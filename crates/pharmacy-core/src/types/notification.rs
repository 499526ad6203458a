use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What a notification warns about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    Expiring,
    Expired,
}

/// Snapshot of the product state that triggered a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "meta_quantity"))]
    pub quantity: Option<i64>,

    #[ts(as = "Option<String>")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "meta_expiring_date"))]
    pub expiring_date: Option<NaiveDate>,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "meta_days_until_expiry"))]
    pub days_until_expiry: Option<i64>,
}

/// A stock or expiry warning shown to storekeepers.
///
/// At most one unread notification exists per (kind, product).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,

    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: NotificationKind,

    pub message: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub is_read: bool,

    #[ts(as = "Option<String>")]
    pub read_at: Option<DateTime<Utc>>,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub metadata: NotificationMetadata,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Query string of `GET /api/notifications`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    pub limit: Option<i64>,
}

impl NotificationFilter {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(crate::DEFAULT_NOTIFICATION_LIMIT)
            .clamp(1, 1000)
    }
}
