//! `/api/supplier`: suppliers, managed by storekeepers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{AdminUser, StoreUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::message;
use crate::AppState;
use pharmacy_core::{CoreError, NewSupplier, SupplierUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).put(update).delete(remove))
}

async fn list(State(state): State<AppState>, _user: StoreUser) -> ApiResult<impl IntoResponse> {
    let suppliers = state.db.suppliers().list().await?;
    Ok(Json(json!({ "suppliers": suppliers })))
}

async fn create(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiJson(request): ApiJson<NewSupplier>,
) -> ApiResult<impl IntoResponse> {
    let supplier = state.db.suppliers().create(request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "supplier": supplier }))))
}

async fn show(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let supplier = state
        .db
        .suppliers()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier"))?;
    Ok(Json(json!({ "supplier": supplier })))
}

async fn update(
    State(state): State<AppState>,
    _user: StoreUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<SupplierUpdate>,
) -> ApiResult<impl IntoResponse> {
    let update = update.normalized()?.ok_or(CoreError::NoUpdates)?;
    let supplier = state.db.suppliers().update(&id, &update).await?;
    Ok(Json(json!({ "supplier": supplier })))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.suppliers().delete(&id).await? {
        return Err(ApiError::not_found("Supplier"));
    }
    Ok(message("Supplier deleted"))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing;
    use pharmacy_core::Role;

    #[tokio::test]
    async fn test_supplier_crud() {
        let state = testing::state().await;
        let keeper = testing::token(&state, "keeper", Role::Storekeeper).await;
        let admin = testing::token(&state, "root", Role::Admin).await;

        let (status, body) = testing::send(&state, Method::POST, "/api/supplier", Some(&keeper), Some(json!({
            "name": "MedSupply Ltd", "email": "sales@medsupply.example",
            "contact": "0302000000", "address": "Spintex Road"
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/supplier/{}", body["supplier"]["id"].as_str().unwrap());

        let (status, body) = testing::send(&state, Method::PATCH, &uri, Some(&keeper), Some(json!({ "address": "Airport City" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["supplier"]["address"], "Airport City");

        let (_, body) = testing::send(&state, Method::GET, "/api/supplier", Some(&keeper), None).await;
        assert_eq!(body["suppliers"].as_array().unwrap().len(), 1);

        let (status, _) = testing::send(&state, Method::DELETE, &uri, Some(&keeper), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = testing::send(&state, Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Supplier deleted");
    }
}
