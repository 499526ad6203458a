//! `/api/orders`: storefront checkout and order fulfilment.
//!
//! Checkout is public. Catalog lines are re-priced from the database, so
//! the client's price and name for a known product are ignored.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::auth::{AdminUser, SalesUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::inventory::{price_order, InventoryAction};
use pharmacy_core::{CoreError, OrderFilter, OrderRequest, OrderUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(checkout))
        .route("/{id}", get(show).patch(update).delete(remove))
}

async fn checkout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let references: Vec<&str> = request.items.iter().filter_map(|l| l.reference()).collect();
    let products = if references.is_empty() {
        Vec::new()
    } else {
        state.db.products().find_by_references(&references).await?
    };

    let draft = price_order(&request, &products)?;
    let order = state.db.orders().create(&draft).await?;

    info!(
        order_id = %order.id,
        items = order.items.len(),
        total_cents = order.total_cents,
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

async fn list(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<impl IntoResponse> {
    let orders = state.db.orders().list(&filter).await?;
    Ok(Json(json!({ "orders": orders })))
}

async fn show(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .db
        .orders()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    Ok(Json(json!({ "order": order })))
}

async fn update(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<OrderUpdate>,
) -> ApiResult<impl IntoResponse> {
    if update.is_empty() {
        return Err(CoreError::NoUpdates.into());
    }

    let transition = state.db.orders().update(&id, &update).await?;
    if transition.inventory != InventoryAction::None {
        info!(
            order_id = %id,
            status = transition.order.status.as_str(),
            inventory = ?transition.inventory,
            "Order inventory adjusted"
        );
    }
    Ok(Json(json!({ "order": transition.order })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.orders().delete(&id).await? {
        return Err(ApiError::not_found("Order"));
    }
    Ok(message("Order deleted"))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing;
    use pharmacy_core::{NewProduct, Role};

    async fn product(state: &AppState, code: &str, quantity: i64) -> String {
        state
            .db
            .products()
            .create(
                NewProduct {
                    category: Some("Skincare".into()),
                    product_name: Some("Shea Butter".into()),
                    price_cents: Some(1_000),
                    notes: Some("250g".into()),
                    product_code: Some(code.into()),
                    quantity: Some(quantity),
                    ..Default::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap()
            .id
    }

    async fn quantity(state: &AppState, id: &str) -> Option<i64> {
        state.db.products().get(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_checkout_reprices_and_keeps_custom_lines() {
        let state = testing::state().await;
        product(&state, "SB-1", 10).await;

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [
                { "productId": "SB-1", "name": "Cheap", "priceCents": 1, "quantity": 2 },
                { "name": "Gift wrap", "priceCents": 150 }
            ],
            "discountCents": 500,
            "orderId": "RCPT-1",
            "customer": { "fullName": "Akua", "emailAddress": "AKUA@EXAMPLE.COM" },
            "address": "5 Oxford Street"
        })))
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let order = &body["order"];
        assert_eq!(order["items"][0]["name"], "Shea Butter");
        assert_eq!(order["items"][0]["priceCents"], 1000);
        assert_eq!(order["items"][1]["quantity"], 1);
        assert_eq!(order["subtotalCents"], 2150);
        assert_eq!(order["totalCents"], 1650);
        assert_eq!(order["receiptCode"], "RCPT-1");
        assert_eq!(order["orderNumber"], "RCPT-1");
        assert_eq!(order["status"], "pending");
        assert_eq!(order["customer"]["email"], "akua@example.com");
    }

    #[tokio::test]
    async fn test_checkout_rejections() {
        let state = testing::state().await;
        product(&state, "SB-2", 10).await;

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({ "items": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cart items are required");

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [{ "productId": "NOPE" }]
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "One or more products could not be found");

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [{ "productId": "SB-2" }, { "productId": "NOPE" }]
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Product NOPE not found");

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [{ "productId": "SB-2", "quantity": 0 }]
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Quantity must be at least 1");

        let (status, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [{ "name": "Gift card", "priceCents": i64::MAX / 2 + 1, "quantity": 2 }]
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "subtotal amount out of range");
    }

    #[tokio::test]
    async fn test_status_transitions_adjust_stock_once() {
        let state = testing::state().await;
        let clerk = testing::token(&state, "clerk", Role::Salesperson).await;
        let id = product(&state, "SB-3", 10).await;

        let (_, body) = testing::send(&state, Method::POST, "/api/orders", None, Some(json!({
            "items": [{ "id": id, "quantity": 4 }]
        })))
        .await;
        let uri = format!("/api/orders/{}", body["order"]["id"].as_str().unwrap());

        let (status, _) = testing::send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let completed = json!({ "status": "completed" });
        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&clerk), Some(completed.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["inventoryAdjusted"], true);
        assert_eq!(quantity(&state, &id).await, Some(6));

        testing::send(&state, Method::PATCH, &uri, Some(&clerk), Some(completed)).await;
        assert_eq!(quantity(&state, &id).await, Some(6));

        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&clerk), Some(json!({ "status": "cancelled" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["inventoryAdjusted"], false);
        assert_eq!(quantity(&state, &id).await, Some(10));

        let (status, body) = testing::send(&state, Method::GET, "/api/orders?status=cancelled", Some(&clerk), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    }
}
