use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Statuses
// =============================================================================

/// Fulfilment status of a storefront order.
///
/// ```text
/// pending ──► processing ──► completed   (stock deducted once)
///    │             │
///    └─────────────┴──────► cancelled    (stock restored if deducted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Payment status of an order, independent of fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Cancelled,
}

// =============================================================================
// Order
// =============================================================================

/// Contact details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderCustomer {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "customer_name"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "customer_email"))]
    pub email: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "customer_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShippingAddress {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "shipping_address"))]
    pub address: Option<String>,
}

/// One line of an order. `product_id` is absent for custom lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Option<String>,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub image: Option<String>,
}

/// A storefront order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: Option<String>,
    pub receipt_code: Option<String>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,

    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub payment_reference: Option<String>,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub customer: OrderCustomer,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub shipping_address: ShippingAddress,

    pub notes: Option<String>,

    /// Set once stock has been deducted for this order.
    pub inventory_adjusted: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// A checkout line. Resolved by database `id`, else by product code.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLineRequest {
    pub id: Option<String>,

    /// Product code. The storefront sends it as `productId`.
    #[serde(alias = "productId")]
    pub product_code: Option<String>,

    pub name: Option<String>,
    pub price_cents: Option<i64>,

    /// Defaults to 1.
    pub quantity: Option<i64>,
    pub image: Option<String>,
}

impl OrderLineRequest {
    /// The product reference this line names, if any.
    pub fn reference(&self) -> Option<&str> {
        super::non_blank(&self.id).or_else(|| super::non_blank(&self.product_code))
    }
}

/// Customer block as the storefront sends it. Older clients use
/// `fullName` / `emailAddress` / `contact`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CustomerRequest {
    #[serde(alias = "fullName")]
    pub name: Option<String>,
    #[serde(alias = "emailAddress")]
    pub email: Option<String>,
    #[serde(alias = "contact")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct AddressRequest {
    #[serde(alias = "line1")]
    pub address: Option<String>,
}

/// Body of the public `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub discount_cents: Option<i64>,

    /// Client receipt code. `orderId` is accepted too.
    #[serde(alias = "orderId")]
    pub receipt_code: Option<String>,
    pub order_number: Option<String>,

    pub customer: Option<CustomerRequest>,
    pub customer_name: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,

    pub shipping_address: Option<AddressRequest>,
    pub address: Option<String>,

    pub payment_status: Option<OrderPaymentStatus>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

impl OrderRequest {
    /// Merges the nested customer block with the flat legacy fields.
    pub fn customer(&self) -> OrderCustomer {
        let nested = self.customer.clone().unwrap_or_default();
        OrderCustomer {
            name: super::non_blank(&nested.name)
                .or_else(|| super::non_blank(&self.customer_name))
                .map(String::from),
            email: super::non_blank(&nested.email)
                .or_else(|| super::non_blank(&self.email))
                .map(|e| e.to_lowercase()),
            phone: super::non_blank(&nested.phone)
                .or_else(|| super::non_blank(&self.contact))
                .map(String::from),
        }
    }

    pub fn shipping_address(&self) -> ShippingAddress {
        let nested = self.shipping_address.clone().unwrap_or_default();
        ShippingAddress {
            address: super::non_blank(&nested.address)
                .or_else(|| super::non_blank(&self.address))
                .map(String::from),
        }
    }

    /// Receipt code, then order number falling back to it.
    pub fn codes(&self) -> (Option<String>, Option<String>) {
        let receipt = super::non_blank(&self.receipt_code).map(String::from);
        let number = super::non_blank(&self.order_number)
            .map(String::from)
            .or_else(|| receipt.clone());
        (receipt, number)
    }
}

/// A priced order ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub order_number: Option<String>,
    pub receipt_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_status: OrderPaymentStatus,
    pub payment_reference: Option<String>,
    pub customer: OrderCustomer,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
}

/// Body of `PATCH /api/orders/:id`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<OrderPaymentStatus>,
    pub notes: Option<String>,
    pub shipping_address: Option<AddressRequest>,
    pub customer: Option<CustomerRequest>,
    pub payment_reference: Option<String>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.payment_status.is_none()
            && self.notes.is_none()
            && self.shipping_address.is_none()
            && self.customer.is_none()
            && self.payment_reference.is_none()
    }
}

/// Query string of `GET /api/orders`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<OrderPaymentStatus>,
}
