//! # Accounts
//!
//! Registration, login and session issuing.
//!
//! ## Login Flow
//! ```text
//! POST /api/auth/login { username, password }
//!      │
//!      ├── unknown user / wrong password ──► 401 "Invalid credentials"
//!      ├── status Inactive ───────────────► 403 "Account is inactive"
//!      ▼
//! invalidate every session of the user     (one active session per user)
//!      │
//!      ▼
//! open session (TTL) ──► sign JWT { sub, role, sid } ──► Set-Cookie pharmacy.sid
//! ```

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::info;

use crate::auth::{hash_password, set_session_cookie, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use pharmacy_core::validation::normalize_username;
use pharmacy_core::{NewUser, Role, User, UserStatus, ValidationError};
use pharmacy_db::{DbError, SessionClient};

const USERNAME_TAKEN: &str = "Username already in use";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Body of `POST /api/auth/signup` and `POST /api/users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub phone: Option<String>,
    pub branch: Option<String>,
    pub balance_cents: Option<i64>,
}

impl RegisterRequest {
    /// Self-service signup sets identity fields and the role only.
    pub fn for_signup(self) -> Self {
        RegisterRequest {
            status: None,
            balance_cents: None,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A freshly opened session: the bearer token and the cookie naming it.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,
    pub cookie: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn username_conflict(err: DbError) -> ApiError {
    if err.is_unique_violation_on("users.username") {
        ApiError::Conflict(USERNAME_TAKEN.to_string())
    } else {
        err.into()
    }
}

/// Creates a user with a hashed password.
///
/// ## Errors
/// - 400 when name, username or password is missing
/// - 409 "Username already in use"
pub async fn register(state: &AppState, request: RegisterRequest) -> ApiResult<User> {
    let (Some(name), Some(username), Some(password)) = (
        present(&request.name),
        present(&request.username),
        present(&request.password),
    ) else {
        return Err(ValidationError::required_together(&["name", "username", "password"]).into());
    };

    let username = normalize_username(username)?;
    let users = state.db.users();
    if users.find_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict(USERNAME_TAKEN.to_string()));
    }

    let user = users
        .create(NewUser {
            name: name.trim().to_string(),
            username,
            password_hash: hash_password(password)?,
            role: request.role.unwrap_or_default(),
            status: request.status.unwrap_or_default(),
            phone: present(&request.phone).map(|p| p.trim().to_string()),
            balance_cents: request.balance_cents.unwrap_or(0),
            branch: present(&request.branch).map(|b| b.trim().to_string()),
        })
        .await
        .map_err(username_conflict)?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Opens a session for `user` and signs a token for it.
pub async fn open_session(
    state: &AppState,
    user: &User,
    client: SessionClient,
) -> ApiResult<SessionGrant> {
    let ttl = state.config.session_ttl_secs;
    let session = state
        .db
        .sessions()
        .create(&user.id, user.role, Duration::seconds(ttl), client)
        .await?;

    Ok(SessionGrant {
        token: state.jwt.issue(&user.id, user.role, &session.id)?,
        cookie: set_session_cookie(&session.id, ttl, state.config.cookie_secure),
    })
}

/// Checks credentials, ends the user's other sessions and opens a new one.
pub async fn login(
    state: &AppState,
    request: LoginRequest,
    client: SessionClient,
) -> ApiResult<(User, SessionGrant)> {
    let (Some(username), Some(password)) = (present(&request.username), present(&request.password))
    else {
        return Err(ValidationError::required_together(&["username", "password"]).into());
    };

    let bad_login = || ApiError::BadLogin(INVALID_CREDENTIALS.to_string());
    let username = normalize_username(username).map_err(|_| bad_login())?;

    let users = state.db.users();
    let mut user = users.find_by_username(&username).await?.ok_or_else(bad_login)?;
    if !verify_password(password, &user.password_hash) {
        return Err(bad_login());
    }
    if !user.is_active() {
        return Err(ApiError::Denied("Account is inactive".to_string()));
    }

    let ended = state.db.sessions().invalidate_for_user(&user.id).await?;
    let grant = open_session(state, &user, client).await?;

    let now = Utc::now();
    users.record_login(&user.id, now).await?;
    user.last_login = Some(now);

    info!(user_id = %user.id, ended_sessions = ended, "User logged in");
    Ok((user, grant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn request(username: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Ama Owusu".into()),
            username: Some(username.into()),
            password: Some("s3cret-pass".into()),
            ..Default::default()
        }
    }

    fn credentials(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_defaults() {
        let state = testing::state().await;
        let user = register(&state, request("  Ama.Owusu ")).await.unwrap();
        assert_eq!(user.username, "ama.owusu");
        assert_eq!(user.role, Role::Salesperson);
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.password_hash.starts_with("$argon2"));

        let err = register(&state, request("AMA.OWUSU")).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already in use");
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let state = testing::state().await;
        let err = register(
            &state,
            RegisterRequest {
                name: Some("Ama".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "name, username, and password are required");
    }

    #[tokio::test]
    async fn test_login_replaces_previous_session() {
        let state = testing::state().await;
        register(&state, request("kofi")).await.unwrap();

        let (_, first) = login(&state, credentials("kofi", "s3cret-pass"), SessionClient::default())
            .await
            .unwrap();
        let (user, second) = login(&state, credentials("Kofi", "s3cret-pass"), SessionClient::default())
            .await
            .unwrap();
        assert!(user.last_login.is_some());

        let now = Utc::now();
        let first_sid = state.jwt.verify(&first.token).unwrap().sid;
        let second_sid = state.jwt.verify(&second.token).unwrap().sid;
        let sessions = state.db.sessions();
        assert!(sessions.find_valid(&first_sid, now).await.unwrap().is_none());
        assert!(sessions.find_valid(&second_sid, now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let state = testing::state().await;
        register(
            &state,
            RegisterRequest {
                status: Some(UserStatus::Inactive),
                ..request("yaw")
            },
        )
        .await
        .unwrap();

        let err = login(&state, credentials("yaw", "wrong"), SessionClient::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = login(&state, credentials("nobody", "s3cret-pass"), SessionClient::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = login(&state, credentials("yaw", "s3cret-pass"), SessionClient::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Denied(_)));

        let err = login(&state, LoginRequest::default(), SessionClient::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "username and password are required");
    }
}
