//! `/api/expense`: business expenses, admin only.

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
use pharmacy_core::{CoreError, ExpenseUpdate, NewExpense};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<impl IntoResponse> {
    let expenses = state.db.expenses().list().await?;
    Ok(Json(json!({ "expenses": expenses })))
}

async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<NewExpense>,
) -> ApiResult<impl IntoResponse> {
    let expense = state.db.expenses().create(request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "expense": expense }))))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let expense = state
        .db
        .expenses()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense"))?;
    Ok(Json(json!({ "expense": expense })))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<ExpenseUpdate>,
) -> ApiResult<impl IntoResponse> {
    let update = update.normalized()?.ok_or(CoreError::NoUpdates)?;
    let expense = state.db.expenses().update(&id, &update).await?;
    Ok(Json(json!({ "expense": expense })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.expenses().delete(&id).await? {
        return Err(ApiError::not_found("Expense"));
    }
    Ok(message("Expense deleted"))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing;
    use pharmacy_core::Role;

    #[tokio::test]
    async fn test_expense_crud() {
        let state = testing::state().await;
        let admin = testing::token(&state, "root", Role::Admin).await;
        let clerk = testing::token(&state, "clerk", Role::Salesperson).await;

        let (status, _) = testing::send(&state, Method::GET, "/api/expense", Some(&clerk), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = testing::send(&state, Method::POST, "/api/expense", Some(&admin), Some(json!({
            "item": "Printer paper", "description": "10 reams", "amountCents": 12000,
            "submittedBy": "root", "date": "2024-06-03"
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/expense/{}", body["expense"]["id"].as_str().unwrap());

        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&admin), Some(json!({ "amountCents": -5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "amount must be non-negative");

        let (status, body) = testing::send(&state, Method::PUT, &uri, Some(&admin), Some(json!({ "amountCents": 9000 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expense"]["amountCents"], 9000);
        assert_eq!(body["expense"]["item"], "Printer paper");

        let (status, body) = testing::send(&state, Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Expense deleted");
    }
}
