use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a walk-in sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileMoney,
    /// Sold on credit.
    Debt,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::MobileMoney,
        PaymentMethod::Debt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Debt => "debt",
        }
    }
}

// =============================================================================
// Sale Payment Status
// =============================================================================

/// Sale lifecycle. `Refunded` is terminal and only reachable by a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SalePaymentStatus {
    #[default]
    Completed,
    Pending,
    Refunded,
}

// =============================================================================
// Sale
// =============================================================================

/// One line of a sale. Name and price are captured at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

/// A completed (or refunded) point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,

    /// `SALE-YYYYMMDD-NNNN`, unique.
    pub sale_number: String,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,

    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: SalePaymentStatus,
    pub cashier_id: String,

    /// Joined from the cashier's user record when listing.
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub cashier_name: Option<String>,

    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    pub fn items_sold(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A cart line as submitted by the till.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    /// Database id of the product. `id` is accepted too.
    #[serde(alias = "id")]
    pub product_id: String,
    pub quantity: i64,
}

/// Body of `POST /api/sales`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleRequest {
    pub items: Vec<SaleLineRequest>,
    pub discount_cents: Option<i64>,

    /// Overrides the computed subtotal when present.
    pub subtotal_cents: Option<i64>,

    /// Overrides the computed total when present.
    pub total_amount_cents: Option<i64>,

    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// A priced, stock-checked sale ready to persist.
///
/// Built by [`crate::inventory::price_sale`]; the sale number and cashier are
/// attached by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    pub items: Vec<SaleItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Partial update for a sale. Inventory is never touched.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleUpdate {
    pub payment_status: Option<SalePaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub discount_cents: Option<i64>,
    pub subtotal_cents: Option<i64>,
    pub total_amount_cents: Option<i64>,
}

impl SaleUpdate {
    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none()
            && self.payment_method.is_none()
            && self.notes.is_none()
            && self.discount_cents.is_none()
            && self.subtotal_cents.is_none()
            && self.total_amount_cents.is_none()
    }
}

/// Query string of `GET /api/sales`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,

    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,

    /// Inclusive: the whole end day is matched.
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,

    /// A payment method, or `all` for no filter.
    pub payment_method: Option<String>,

    /// Substring match on the sale number or notes.
    pub search: Option<String>,
}

impl SaleFilter {
    /// 1-based page, at least 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, between 1 and 500.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(crate::DEFAULT_PAGE_SIZE).clamp(1, 500)
    }

    /// Rows to skip. Absurd page numbers saturate instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// The payment method to filter on, ignoring `all` and unknown values.
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        let wanted = self.payment_method.as_deref()?;
        PaymentMethod::ALL.into_iter().find(|m| m.as_str() == wanted)
    }

    pub fn search(&self) -> Option<&str> {
        super::non_blank(&self.search)
    }
}

/// Pagination block returned alongside a page of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}
