//! `/api/products`: the dashboard catalog.
//!
//! Every create and update re-evaluates the product's low-stock and expiry
//! alerts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::auth::{AdminUser, StaffUser, StoreUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::{message, today};
use crate::services::alerts;
use crate::AppState;
use pharmacy_core::{CoreError, NewProduct, ProductUpdate};
use pharmacy_db::DbError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
}

fn code_conflict(err: DbError) -> ApiError {
    if err.is_unique_violation_on("products.product_code") {
        ApiError::Conflict("productId already exists".to_string())
    } else {
        err.into()
    }
}

async fn list(State(state): State<AppState>, _user: StaffUser) -> ApiResult<impl IntoResponse> {
    let products = state.db.products().list().await?;
    Ok(Json(json!({ "products": products })))
}

async fn show(
    State(state): State<AppState>,
    _user: StaffUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .db
        .products()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    Ok(Json(json!({ "product": product })))
}

async fn create(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiJson(request): ApiJson<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .db
        .products()
        .create(request.validate()?)
        .await
        .map_err(code_conflict)?;

    alerts::check_product(&state.db, &product, today()).await;
    info!(product_id = %product.id, name = %product.product_name, "Product created");

    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

async fn update(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<impl IntoResponse> {
    if update.is_empty() {
        return Err(CoreError::NoUpdates.into());
    }
    update.validate()?;

    let product = state
        .db
        .products()
        .update(&id, &update)
        .await
        .map_err(code_conflict)?;

    alerts::check_product(&state.db, &product, today()).await;
    Ok(Json(json!({ "product": product })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.products().delete(&id).await? {
        return Err(ApiError::not_found("Product"));
    }
    info!(product_id = %id, "Product deleted");
    Ok(message("Product deleted"))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::testing;
    use pharmacy_core::Role;

    fn syrup(code: &str, quantity: i64) -> Value {
        json!({
            "category": "Syrup",
            "productName": "Cough Syrup",
            "priceCents": 1500,
            "notes": "100ml",
            "productId": code,
            "quantity": quantity,
        })
    }

    #[tokio::test]
    async fn test_create_product_and_gates() {
        let state = testing::state().await;
        let keeper = testing::token(&state, "keeper", Role::Storekeeper).await;
        let clerk = testing::token(&state, "clerk", Role::Salesperson).await;

        let (status, _) = testing::send(&state, Method::POST, "/api/products", Some(&clerk), Some(syrup("CS-1", 50))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = testing::send(&state, Method::POST, "/api/products", Some(&keeper), Some(syrup("CS-1", 50))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["product"]["productCode"], "CS-1");
        assert_eq!(body["product"]["publishStatus"], "yes");

        let (status, body) = testing::send(&state, Method::POST, "/api/products", Some(&keeper), Some(syrup("CS-1", 5))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "productId already exists");

        let (status, body) = testing::send(&state, Method::POST, "/api/products", Some(&keeper), Some(json!({ "category": "Syrup" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "category, productName, price, notes are required");

        let (status, body) = testing::send(&state, Method::GET, "/api/products", Some(&clerk), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_stock_write_raises_notification() {
        let state = testing::state().await;
        let keeper = testing::token(&state, "keeper", Role::Storekeeper).await;

        let (_, body) = testing::send(&state, Method::POST, "/api/products", Some(&keeper), Some(syrup("CS-2", 50))).await;
        let id = body["product"]["id"].as_str().unwrap().to_string();
        assert_eq!(state.db.notifications().unread_count().await.unwrap(), 0);

        let (status, body) = testing::send(&state, Method::PATCH, &format!("/api/products/{id}"), Some(&keeper), Some(json!({ "quantity": 3 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["quantity"], 3);
        assert_eq!(state.db.notifications().unread_count().await.unwrap(), 1);

        let (status, body) = testing::send(&state, Method::PATCH, &format!("/api/products/{id}"), Some(&keeper), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No updates provided");
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let state = testing::state().await;
        let keeper = testing::token(&state, "keeper", Role::Storekeeper).await;
        let admin = testing::token(&state, "root", Role::Admin).await;

        let (_, body) = testing::send(&state, Method::POST, "/api/products", Some(&keeper), Some(syrup("CS-3", 50))).await;
        let uri = format!("/api/products/{}", body["product"]["id"].as_str().unwrap());

        let (status, _) = testing::send(&state, Method::DELETE, &uri, Some(&keeper), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = testing::send(&state, Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product deleted");

        let (status, body) = testing::send(&state, Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product not found");
    }
}
