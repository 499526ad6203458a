//! # pharmacy-core: Pure Business Logic for the Pharmacy Back-Office
//!
//! Everything in this crate is deterministic: callers pass in the clock
//! (`now` / `today`) and the crate never touches the database or network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharmacy Back-Office Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Dashboard / Storefront (HTTP)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON REST                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/api (axum routes + services)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pharmacy-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │inventory │ │ alerts  │ │ stats  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                pharmacy-db (SQLite repositories)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (User, Product, Sale, Order, ...)
//! - [`money`] - Integer money (cents)
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules shared by every write path
//! - [`codes`] - Sale numbers and generated stock codes
//! - [`inventory`] - Stock checks and order inventory transitions
//! - [`alerts`] - Low-stock / expiry notification rules
//! - [`stats`] - Sales statistics
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use pharmacy_core::codes::sale_number;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
//! assert_eq!(sale_number(day, 0), "SALE-20240309-0001");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod codes;
pub mod error;
pub mod inventory;
pub mod money;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// A product with fewer units than this raises a low-stock notification.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Products expiring within this many days raise an expiring notification.
pub const EXPIRING_DAYS_THRESHOLD: i64 = 30;

/// Default page size for sale listings.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Default number of notifications returned by a listing.
pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 100;

/// Where the dashboard sends a user after authenticating.
pub const DASHBOARD_REDIRECT: &str = "/dashboard";
