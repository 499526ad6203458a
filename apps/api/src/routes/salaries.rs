//! `/api/salaries`: monthly salary records, admin only.
//!
//! ```text
//! POST { employeeId, month, year, paymentStatus, ... }
//!   (employee, month) unseen ──► 201 { salary }   created
//!   (employee, month) exists ──► 200 { salary }   payment fields updated
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::{CoreError, SalaryRequest, SalaryUpdate};
use pharmacy_db::SalaryUpsert;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(record))
        .route("/{id}", get(show).patch(update).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<impl IntoResponse> {
    let salaries = state.db.salaries().list().await?;
    Ok(Json(json!({ "salaries": salaries })))
}

async fn record(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<SalaryRequest>,
) -> ApiResult<impl IntoResponse> {
    let (salary, outcome) = state.db.salaries().upsert(&request.validate()?).await?;
    info!(salary_id = %salary.id, month = %salary.month, ?outcome, "Salary recorded");

    let status = match outcome {
        SalaryUpsert::Created => StatusCode::CREATED,
        SalaryUpsert::Updated => StatusCode::OK,
    };
    Ok((status, Json(json!({ "salary": salary }))))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let salary = state
        .db
        .salaries()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Salary"))?;
    Ok(Json(json!({ "salary": salary })))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<SalaryUpdate>,
) -> ApiResult<impl IntoResponse> {
    if update.is_empty() {
        return Err(CoreError::NoUpdates.into());
    }

    let salary = state.db.salaries().update(&id, &update).await.map_err(|e| {
        if e.is_unique_violation_on("salaries.") {
            ApiError::Conflict("Salary record already exists for this employee and month".to_string())
        } else {
            e.into()
        }
    })?;
    Ok(Json(json!({ "salary": salary })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.salaries().delete(&id).await? {
        return Err(ApiError::not_found("Salary"));
    }
    Ok(message("Salary deleted"))
}
