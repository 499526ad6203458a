//! # pharmacy-db: SQLite Persistence for the Pharmacy Back-Office
//!
//! Repositories over a `sqlx` SQLite pool. Business rules live in
//! `pharmacy-core`; this crate only stores and loads records and enforces the
//! invariants the database can enforce atomically (unique codes, conditional
//! stock decrements, one open notification per product and type).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharmacy Back-Office Data Flow                      │
//! │                                                                         │
//! │  axum handler / service (apps/api)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   pharmacy-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial_ │  │   │
//! │  │   │ UnitOfWork    │    │ OrderRepo     │    │   schema.sql │  │   │
//! │  │   │               │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite database (pharmacy.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`unit`] - Transaction-or-direct unit of work
//! - [`repository`] - One repository per entity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmacy_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pharmacy.db")).await?;
//! let products = db.products().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::customer::CustomerRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::notification::NotificationRepository;
pub use repository::order::{OrderRepository, OrderTransition};
pub use repository::product::ProductRepository;
pub use repository::salary::{SalaryRepository, SalaryUpsert};
pub use repository::sale::SaleRepository;
pub use repository::session::{SessionClient, SessionRepository};
pub use repository::stock::StockRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
pub use unit::UnitOfWork;
