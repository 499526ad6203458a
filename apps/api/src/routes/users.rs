//! `/api/users`: account administration and the caller's own profile.
//!
//! ```text
//! GET/POST        /                 admin
//! GET/PUT/PATCH   /profile/me       any signed-in user (self)
//! GET             /{id}             admin
//! PUT/PATCH       /{id}             admin, or the user themself
//! DELETE          /{id}             admin, never self
//! ```
//!
//! Only admins may change `role` or `status`; those fields are silently
//! dropped for everyone else.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{hash_password, AdminUser, Authenticated, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::services::accounts::{self, RegisterRequest};
use crate::AppState;
use pharmacy_core::validation::normalize_username;
use pharmacy_core::{Role, User, UserStatus, UserUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/profile/me", get(profile).put(update_profile).patch(update_profile))
        .route("/{id}", get(show).put(update).patch(update).delete(remove))
}

/// Body of a user update. `role` and `status` arrive as plain strings so an
/// unknown value is ignored instead of failing the whole update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Option<UserStatus> {
    match value {
        "Active" => Some(UserStatus::Active),
        "Inactive" => Some(UserStatus::Inactive),
        _ => None,
    }
}

impl UserPatch {
    fn into_update(self, admin: bool) -> ApiResult<UserUpdate> {
        let filled = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let username = match filled(self.username) {
            Some(username) => Some(normalize_username(&username)?),
            None => None,
        };
        let password_hash = match filled(self.password) {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };

        let (role, status) = if admin {
            (
                self.role.as_deref().and_then(|r| r.parse::<Role>().ok()),
                self.status.as_deref().and_then(parse_status),
            )
        } else {
            (None, None)
        };

        Ok(UserUpdate {
            name: filled(self.name),
            username,
            phone: self.phone.map(|p| p.trim().to_string()),
            password_hash,
            role,
            status,
        })
    }
}

async fn apply_update(
    state: &AppState,
    caller: &CurrentUser,
    id: &str,
    patch: UserPatch,
) -> ApiResult<User> {
    if !caller.is_admin() && caller.user_id != id {
        return Err(ApiError::Denied("Insufficient permissions".to_string()));
    }

    let update = patch.into_update(caller.is_admin())?;
    if update.is_empty() {
        return Err(ApiError::BadRequest("No valid fields to update".to_string()));
    }

    let user = state.db.users().update(id, &update).await.map_err(|e| {
        if e.is_unique_violation_on("users.username") {
            ApiError::Conflict("Username already in use".to_string())
        } else {
            e.into()
        }
    })?;

    // Sessions carry the role they were opened with.
    if update.role.is_some() || update.status.is_some() {
        let ended = state.db.sessions().invalidate_for_user(id).await?;
        info!(user_id = %id, sessions = ended, "Access changed, sessions ended");
    }

    info!(user_id = %id, by = %caller.user_id, "User updated");
    Ok(user)
}

async fn find(state: &AppState, id: &str) -> ApiResult<User> {
    state
        .db
        .users()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<impl IntoResponse> {
    let users = state.db.users().list().await?;
    Ok(Json(json!({ "users": users })))
}

async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = accounts::register(&state, request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

async fn profile(
    State(state): State<AppState>,
    Authenticated(current): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let user = find(&state, &current.user_id).await?;
    Ok(Json(json!({ "user": user })))
}

async fn update_profile(
    State(state): State<AppState>,
    Authenticated(current): Authenticated,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<impl IntoResponse> {
    let user = apply_update(&state, &current, &current.user_id, patch).await?;
    Ok(Json(json!({ "user": user })))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let user = find(&state, &id).await?;
    Ok(Json(json!({ "user": user })))
}

async fn update(
    State(state): State<AppState>,
    Authenticated(current): Authenticated,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<impl IntoResponse> {
    let user = apply_update(&state, &current, &id, patch).await?;
    Ok(Json(json!({ "user": user })))
}

async fn remove(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    if admin.user.user_id == id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    let ended = state.db.sessions().invalidate_for_user(&id).await?;
    if !state.db.users().delete(&id).await? {
        return Err(ApiError::not_found("User"));
    }

    info!(user_id = %id, ended_sessions = ended, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
