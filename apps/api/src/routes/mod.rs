//! # Routes
//!
//! One router per resource, nested under `/api` by [`crate::build_router`].
//!
//! ## Role Gates
//! ```text
//! ┌──────────────┬──────────────────────────────────┐
//! │ AdminUser    │ admin                            │
//! │ SalesUser    │ admin, salesperson               │
//! │ StoreUser    │ admin, storekeeper               │
//! │ StaffUser    │ admin, salesperson, storekeeper  │
//! │ Authenticated│ any signed-in user               │
//! └──────────────┴──────────────────────────────────┘
//! ```
//!
//! Handlers reply `{ "<entity>": ... }` or `{ "<entities>": [...] }`.

pub mod auth;
pub mod customers;
pub mod employees;
pub mod expenses;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod root;
pub mod salaries;
pub mod sales;
pub mod stocks;
pub mod storefront;
pub mod suppliers;
pub mod users;

use axum::Json;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

/// `{ "message": ... }`
pub(crate) fn message(text: impl Into<String>) -> Json<Value> {
    Json(json!({ "message": text.into() }))
}

/// The current UTC calendar day.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
