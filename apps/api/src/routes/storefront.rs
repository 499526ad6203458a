//! `/api/storefront`: the public catalog. Only published products are
//! visible.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list))
        .route("/products/{id}", get(show))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CatalogQuery {
    in_stock_only: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<impl IntoResponse> {
    let in_stock_only = query.in_stock_only.as_deref() == Some("true");
    let products = state.db.products().list_published(in_stock_only).await?;
    Ok(Json(json!({ "products": products })))
}

async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .db
        .products()
        .get_published(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    Ok(Json(json!({ "product": product })))
}
