//! `/api/customers`: business customers. Salespeople may list and add;
//! only admins edit or delete.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{AdminUser, SalesUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::{CoreError, CustomerUpdate, NewCustomer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
}

async fn list(State(state): State<AppState>, _user: SalesUser) -> ApiResult<impl IntoResponse> {
    let customers = state.db.customers().list().await?;
    Ok(Json(json!({ "customers": customers })))
}

async fn create(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiJson(request): ApiJson<NewCustomer>,
) -> ApiResult<impl IntoResponse> {
    let customer = state.db.customers().create(request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "customer": customer }))))
}

async fn show(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let customer = state
        .db
        .customers()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;
    Ok(Json(json!({ "customer": customer })))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<CustomerUpdate>,
) -> ApiResult<impl IntoResponse> {
    let update = update.normalized()?.ok_or(CoreError::NoUpdates)?;
    let customer = state.db.customers().update(&id, &update).await?;
    Ok(Json(json!({ "customer": customer })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.customers().delete(&id).await? {
        return Err(ApiError::not_found("Customer"));
    }
    Ok(message("Customer deleted"))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing;
    use pharmacy_core::Role;

    #[tokio::test]
    async fn test_customer_gates() {
        let state = testing::state().await;
        let clerk = testing::token(&state, "clerk", Role::Salesperson).await;
        let admin = testing::token(&state, "root", Role::Admin).await;

        let (status, body) = testing::send(&state, Method::POST, "/api/customers", Some(&clerk), Some(json!({
            "name": "Kasoa Pharmacy", "businessAddress": "Kasoa", "contact": "0200000000",
            "email": "Orders@Kasoa.example"
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["customer"]["email"], "orders@kasoa.example");
        let uri = format!("/api/customers/{}", body["customer"]["id"].as_str().unwrap());

        let (status, _) = testing::send(&state, Method::PATCH, &uri, Some(&clerk), Some(json!({ "contact": "1" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&admin), Some(json!({ "contact": " 0244111111 " }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customer"]["contact"], "0244111111");

        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&admin), Some(json!({ "name": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No updates provided");

        let (status, body) = testing::send(&state, Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Customer deleted");

        let (status, body) = testing::send(&state, Method::GET, &uri, Some(&clerk), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Customer not found");
    }

    #[tokio::test]
    async fn test_customer_requires_fields() {
        let state = testing::state().await;
        let clerk = testing::token(&state, "clerk", Role::Salesperson).await;

        let (status, body) = testing::send(&state, Method::POST, "/api/customers", Some(&clerk), Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name, businessAddress, contact, email are required");
    }
}
