//! `/api/auth`: signup, login, logout and the current user.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::auth::{clear_session_cookie, presented_session_id, Authenticated};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ClientInfo};
use crate::routes::message;
use crate::services::accounts::{self, LoginRequest, RegisterRequest};
use crate::AppState;
use pharmacy_core::DASHBOARD_REDIRECT;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/redirect", get(redirect))
        .route("/users", get(users))
}

async fn signup(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = accounts::register(&state, request.for_signup()).await?;
    let grant = accounts::open_session(&state, &user, client).await?;

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, grant.cookie)],
        Json(json!({
            "message": "User created successfully",
            "user": user,
            "token": grant.token,
            "redirectUrl": DASHBOARD_REDIRECT,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, grant) = accounts::login(&state, request, client).await?;

    Ok((
        [(SET_COOKIE, grant.cookie)],
        Json(json!({
            "message": "Login successful",
            "user": user,
            "token": grant.token,
            "redirectUrl": DASHBOARD_REDIRECT,
        })),
    ))
}

/// Ends the presented session, if any. Always succeeds.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    if let Some(session_id) = presented_session_id(&headers, &state) {
        if state.db.sessions().invalidate(&session_id).await? {
            info!(session_id = %session_id, "Session ended");
        }
    }

    Ok((
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        message("Logout successful"),
    ))
}

async fn me(
    State(state): State<AppState>,
    Authenticated(current): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .users()
        .get(&current.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(json!({ "user": user, "redirectUrl": DASHBOARD_REDIRECT })))
}

async fn redirect(Authenticated(_): Authenticated) -> impl IntoResponse {
    Json(json!({ "redirectUrl": DASHBOARD_REDIRECT }))
}

async fn users(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let users = state.db.users().list().await?;
    Ok(Json(json!({ "users": users })))
}
