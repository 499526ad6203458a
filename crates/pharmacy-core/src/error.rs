//! # Error Types
//!
//! Domain-specific error types for pharmacy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharmacy-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharmacy-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  API errors (in apps/api)                                              │
//! │  └── ApiError         - `{ "error": ... }` + HTTP status               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → client                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant's message is the exact text a client receives, so the
//! wording here is part of the API contract.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations. All of them are client errors (HTTP 400).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale was submitted without any line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// An order was submitted without any line items.
    #[error("Cart items are required")]
    EmptyOrder,

    /// One or more products referenced by a sale do not exist.
    #[error("Some products not found")]
    ProductsNotFound,

    /// None of the products referenced by an order could be resolved.
    #[error("One or more products could not be found")]
    NoProductsResolved,

    /// A single order line references an unknown product.
    #[error("Product {0} not found")]
    ProductNotFound(String),

    /// An order line references a product deleted since checkout.
    #[error("Product {0} no longer exists")]
    ProductGone(String),

    /// The product's expiry date is in the past.
    #[error("Product {name} has expired")]
    ProductExpired { name: String },

    /// Not enough units on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /api/sales  { items: [{ productId, quantity: 5 }] }
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// 400 "Insufficient stock for Paracetamol. Available: 3, Requested: 5"
    /// ```
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Line quantity below one.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Sale already refunded")]
    AlreadyRefunded,

    /// Refunds must go through the refund operation so stock is restored.
    #[error("Use the refund endpoint to refund a sale")]
    RefundViaUpdate,

    /// A PATCH body contained no recognised fields.
    #[error("No updates provided")]
    NoUpdates,

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or database work happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Several required fields, reported together.
    #[error("{} are required", fields.join(", "))]
    RequiredFields { fields: Vec<String> },

    /// Fields required together, listed in prose ("a, b, and c").
    #[error("{} are required", prose_list(fields))]
    RequiredTogether { fields: Vec<String> },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must be non-negative")]
    Negative { field: String },

    /// A computed amount does not fit in i64 cents.
    #[error("{field} amount out of range")]
    AmountOverflow { field: String },

    /// Invalid format (e.g., bad email, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for the multi-field "are required" message.
    pub fn required_fields(fields: &[&str]) -> Self {
        ValidationError::RequiredFields {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn required_together(fields: &[&str]) -> Self {
        ValidationError::RequiredTogether {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn prose_list(fields: &[String]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
