//! # Sales Routes
//!
//! ```text
//! POST    /            salesperson   price, record and deduct a cart
//! GET     /            salesperson   paginated, filtered listing
//! GET     /stats       salesperson   period statistics vs. previous period
//! GET     /daily       salesperson   today vs. yesterday
//! GET     /{id}        salesperson
//! PATCH   /{id}        salesperson   payment / notes / amounts, never stock
//! DELETE  /{id}        admin         refund: restore stock, mark refunded
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{AdminUser, SalesUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::today;
use crate::AppState;
use pharmacy_core::stats::{daily_stats, sales_stats, start_of_day, StatsPeriod, Window};
use pharmacy_core::{CoreError, SaleFilter, SalePaymentStatus, SaleRequest, SaleUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/daily", get(daily))
        .route("/{id}", get(show).patch(update).delete(refund))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsQuery {
    period: Option<StatsPeriod>,
}

async fn create(
    State(state): State<AppState>,
    cashier: SalesUser,
    ApiJson(request): ApiJson<SaleRequest>,
) -> ApiResult<impl IntoResponse> {
    let sale = state
        .db
        .sales()
        .create(
            &request,
            &cashier.user.user_id,
            today(),
            state.config.sales_use_transactions,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "sale": sale,
            "message": "Sale completed successfully",
        })),
    ))
}

async fn list(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiQuery(filter): ApiQuery<SaleFilter>,
) -> ApiResult<impl IntoResponse> {
    let (sales, pagination) = state.db.sales().list(&filter).await?;
    Ok(Json(json!({ "sales": sales, "pagination": pagination })))
}

async fn stats(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> ApiResult<impl IntoResponse> {
    let period = query.period.unwrap_or_default();
    let window = period.window(Utc::now());

    let sales = state.db.sales();
    let current = sales.completed_in(window).await?;
    let previous = sales.completed_in(window.previous()).await?;

    Ok(Json(sales_stats(period, &current, &previous)))
}

async fn daily(State(state): State<AppState>, _user: SalesUser) -> ApiResult<impl IntoResponse> {
    let start = start_of_day(Utc::now());
    let window = Window {
        start,
        end: start + Duration::days(1),
    };

    let sales = state.db.sales();
    let today = sales.completed_in(window).await?;
    let yesterday = sales.completed_in(window.previous()).await?;

    Ok(Json(daily_stats(&today, &yesterday)))
}

async fn show(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let sale = state
        .db
        .sales()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale"))?;
    Ok(Json(json!({ "sale": sale })))
}

async fn update(
    State(state): State<AppState>,
    _user: SalesUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<SaleUpdate>,
) -> ApiResult<impl IntoResponse> {
    if update.is_empty() {
        return Err(CoreError::NoUpdates.into());
    }
    if update.payment_status == Some(SalePaymentStatus::Refunded) {
        return Err(CoreError::RefundViaUpdate.into());
    }

    let sale = state.db.sales().update(&id, &update).await?;
    Ok(Json(json!({ "sale": sale })))
}

async fn refund(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let sale = state.db.sales().refund(&id).await?;
    info!(sale_number = %sale.sale_number, by = %admin.user.user_id, "Sale refunded");

    Ok(Json(json!({
        "success": true,
        "message": "Sale refunded successfully",
        "sale": sale,
    })))
}
