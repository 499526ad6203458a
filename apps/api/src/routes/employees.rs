//! `/api/employees`: staff records, admin only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::{CoreError, EmployeeUpdate, NewEmployee};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<impl IntoResponse> {
    let employees = state.db.employees().list().await?;
    Ok(Json(json!({ "employees": employees })))
}

async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<NewEmployee>,
) -> ApiResult<impl IntoResponse> {
    let employee = state.db.employees().create(request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "employee": employee }))))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let employee = state
        .db
        .employees()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee"))?;
    Ok(Json(json!({ "employee": employee })))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<EmployeeUpdate>,
) -> ApiResult<impl IntoResponse> {
    let update = update.normalized()?.ok_or(CoreError::NoUpdates)?;
    let employee = state.db.employees().update(&id, &update).await?;
    Ok(Json(json!({ "employee": employee })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.employees().delete(&id).await? {
        return Err(ApiError::not_found("Employee"));
    }
    Ok(message("Employee deleted"))
}
