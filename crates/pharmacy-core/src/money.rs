//! # Money Module
//!
//! Provides the `Money` type for monetary values.
//!
//! Every amount in the system (product prices, sale totals, salaries,
//! expenses) is stored and transported as integer cents. `Money` is the
//! arithmetic wrapper used when those amounts are combined.
//!
//! ## Usage
//! ```rust
//! use pharmacy_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let line = price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line.cents(), 2198);
//!
//! // Amounts past i64 cents are refused rather than wrapped.
//! assert!(Money::from_cents(i64::MAX).checked_multiply_quantity(2).is_none());
//!
//! // Discounts never push a total below zero.
//! let total = line.minus_floor_zero(Money::from_cents(5000));
//! assert!(total.is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► SaleItem.unit_price_cents ──► SaleItem.total_price_cents
///                                                              │
///                                           Σ lines ──► Sale.subtotal_cents
///                                                              │
///                                  − discount (floored at 0) ──► Sale.total_amount_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use pharmacy_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_multiply_quantity(3).map(|m| m.cents()), Some(897));
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, or `None` as soon as the running total overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Subtracts `other`, clamping the result at zero.
    ///
    /// Used for `total = max(subtotal - discount, 0)` on sales and orders.
    #[inline]
    pub fn minus_floor_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Clamps a negative amount (e.g. a client-sent discount) to zero.
    #[inline]
    pub fn non_negative(self) -> Money {
        Money(self.0.max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented formatting. Clients format amounts themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
