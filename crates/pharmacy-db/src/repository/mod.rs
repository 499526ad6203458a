//! # Repository Module
//!
//! One repository per table family. Each wraps a cloned `SqlitePool` and is
//! handed out by [`crate::Database`].
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler / service                                                      │
//! │       │  db.sales().create(&request, cashier_id, today, false)          │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── create(...)     ── UnitOfWork + conditional stock decrements       │
//! │  ├── list(filter)    ── QueryBuilder with optional filters              │
//! │  ├── refund(id)      ── conditional status flip + stock restore         │
//! │  └── ...                                                                │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Queries are built at runtime with `query_as::<_, T>` and `FromRow`.
//! - Partial updates use `SET col = COALESCE(?, col)` so absent fields stay.
//! - Timestamps are bound from Rust (`Utc::now()`), never from SQL.
//! - `get` returns `Option`; `update` / `delete` return `NotFound` or `false`
//!   when the row is missing.

pub mod customer;
pub mod employee;
pub mod expense;
pub mod notification;
pub mod order;
pub mod product;
pub mod salary;
pub mod sale;
pub mod session;
pub mod stock;
pub mod supplier;
pub mod user;

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by repository tests.

    use pharmacy_core::{NewProduct, Product};

    use crate::pool::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn product(db: &Database, name: &str, price_cents: i64, quantity: i64) -> Product {
        db.products()
            .create(
                NewProduct {
                    category: Some("Tablets".into()),
                    product_name: Some(name.into()),
                    price_cents: Some(price_cents),
                    notes: Some("test".into()),
                    quantity: Some(quantity),
                    ..Default::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap()
    }
}
