use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Role
// =============================================================================

/// What a user is allowed to do.
///
/// ```text
/// admin        ── everything
/// salesperson  ── sales, orders, customers
/// storekeeper  ── products, stock, suppliers, notifications
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Salesperson,
    Storekeeper,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Salesperson, Role::Storekeeper];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Salesperson => "salesperson",
            Role::Storekeeper => "storekeeper",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Salesperson
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.to_string()).collect(),
            })
    }
}

// =============================================================================
// User Status
// =============================================================================

/// Account status. Inactive accounts cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

// =============================================================================
// User
// =============================================================================

/// A back-office account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,

    /// Unique, stored trimmed and lowercased.
    pub username: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,

    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub balance_cents: i64,

    #[ts(as = "Option<String>")]
    pub last_login: Option<DateTime<Utc>>,

    pub branch: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Fields needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub balance_cents: i64,
    pub branch: Option<String>,
}

/// Partial user update as persisted. `password_hash` is set only when the
/// caller supplied a new password.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.phone.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.status.is_none()
    }
}

// =============================================================================
// Session
// =============================================================================

/// A server-side login session. Its `id` is the cookie value and the `sid`
/// claim of the bearer token.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub is_active: bool,

    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,

    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    #[ts(as = "String")]
    pub last_activity: DateTime<Utc>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session authenticates only while active and unexpired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("storekeeper".parse::<Role>().unwrap(), Role::Storekeeper);

        let err = "manager".parse::<Role>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "role must be one of: admin, salesperson, storekeeper"
        );
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            name: "Ama".into(),
            username: "ama".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Salesperson,
            status: UserStatus::Active,
            phone: None,
            balance_cents: 0,
            last_login: None,
            branch: Some("Main".into()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "salesperson");
        assert_eq!(json["status"], "Active");
        assert_eq!(json["balanceCents"], 0);
    }

    #[test]
    fn test_session_validity() {
        let now = Utc::now();
        let mut session = Session {
            id: "s1".into(),
            user_id: "u1".into(),
            role: Role::Admin,
            is_active: true,
            expires_at: now + Duration::hours(1),
            user_agent: None,
            ip_address: None,
            last_activity: now,
            created_at: now,
        };
        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::hours(2)));

        session.is_active = false;
        assert!(!session.is_valid_at(now));
    }
}
