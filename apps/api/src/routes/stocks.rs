//! `/api/stocks`: restock batches. Each batch gets a generated 4-character
//! product code.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::auth::{AdminUser, StoreUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::{CoreError, NewStock, StockUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
}

async fn list(State(state): State<AppState>, _user: StoreUser) -> ApiResult<impl IntoResponse> {
    let stocks = state.db.stocks().list().await?;
    Ok(Json(json!({ "stocks": stocks })))
}

async fn create(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiJson(request): ApiJson<NewStock>,
) -> ApiResult<impl IntoResponse> {
    let stock = state.db.stocks().create(request.validate()?).await?;
    info!(stock_id = %stock.id, code = %stock.product_code, "Stock batch recorded");
    Ok((StatusCode::CREATED, Json(json!({ "stock": stock }))))
}

async fn show(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let stock = state
        .db
        .stocks()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Stock"))?;
    Ok(Json(json!({ "stock": stock })))
}

async fn update(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<StockUpdate>,
) -> ApiResult<impl IntoResponse> {
    if update.is_empty() {
        return Err(CoreError::NoUpdates.into());
    }
    update.validate()?;
    let stock = state.db.stocks().update(&id, &update).await?;
    Ok(Json(json!({ "stock": stock })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.stocks().delete(&id).await? {
        return Err(ApiError::not_found("Stock"));
    }
    Ok(message("Stock deleted"))
}
