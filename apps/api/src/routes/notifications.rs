//! `/api/notifications`: low-stock and expiry warnings for storekeepers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{AdminUser, StoreUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::NotificationFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/count", get(count))
        .route("/read-all", patch(read_all))
        .route("/{id}/read", patch(read))
        .route("/{id}", delete(remove))
}

async fn list(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
) -> ApiResult<impl IntoResponse> {
    let notifications = state.db.notifications().list(&filter).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

async fn count(State(state): State<AppState>, _user: StoreUser) -> ApiResult<impl IntoResponse> {
    let unread = state.db.notifications().unread_count().await?;
    Ok(Json(json!({ "unreadCount": unread })))
}

async fn read(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let notification = state.db.notifications().mark_read(&id).await?;
    Ok(Json(json!({ "notification": notification })))
}

async fn read_all(State(state): State<AppState>, _user: StoreUser) -> ApiResult<impl IntoResponse> {
    let marked = state.db.notifications().mark_all_read().await?;
    Ok(message(format!("{marked} notifications marked as read")))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.notifications().delete(&id).await? {
        return Err(ApiError::not_found("Notification"));
    }
    Ok(message("Notification deleted"))
}
