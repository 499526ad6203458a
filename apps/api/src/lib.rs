//! # pharmacy-api
//!
//! axum REST server for the pharmacy back-office: dashboard staff
//! authenticate and manage stock, sales and records; the public storefront
//! reads the catalog and places orders.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  TraceLayer ──► CorsLayer ──► security headers                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Router ──► extractors (ApiJson / ApiPath / role gate)                  │
//! │     │              │                                                    │
//! │     │              └── 400 / 401 / 403 as { "error": ... }              │
//! │     ▼                                                                   │
//! │  handler ──► services ──► pharmacy-core rules ──► pharmacy-db           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  { "<entity>": ... }   or   ApiError ──► { "error": ... }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `ApiConfig` from defaults, `pharmacy.toml` and env
//! - [`auth`] - JWT + session authentication and role gates
//! - [`error`] - `ApiError` and its JSON rendering
//! - [`extract`] - Extractors that keep the error envelope
//! - [`middleware`] - Security headers and CORS
//! - [`routes`] - One router per resource
//! - [`services`] - Accounts and notification checks
//! - [`jobs`] - Background timers

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use pharmacy_db::Database;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expires_in_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::root::router())
        .nest("/api/auth", routes::auth::router())
        .nest("/api/users", routes::users::router())
        .nest("/api/products", routes::products::router())
        .nest("/api/storefront", routes::storefront::router())
        .nest("/api/stocks", routes::stocks::router())
        .nest("/api/sales", routes::sales::router())
        .nest("/api/orders", routes::orders::router())
        .nest("/api/notifications", routes::notifications::router())
        .nest("/api/customers", routes::customers::router())
        .nest("/api/employees", routes::employees::router())
        .nest("/api/supplier", routes::suppliers::router())
        .nest("/api/salaries", routes::salaries::router())
        .nest("/api/expense", routes::expenses::router())
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(middleware::cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

// =============================================================================
// Test Support
// =============================================================================
