use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::non_blank;
use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{require_fields, validate_non_negative, ValidationResult};

// =============================================================================
// Publish Status
// =============================================================================

/// Whether a product is visible on the public storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Yes,
    No,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable product and its on-hand quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub category: String,
    pub product_name: String,

    /// Optional business code (unique when present).
    pub product_code: Option<String>,

    pub price_cents: i64,
    pub notes: String,

    #[ts(as = "Option<String>")]
    pub expiring_date: Option<NaiveDate>,

    /// Units on hand. `None` means the product was never stocked.
    pub quantity: Option<i64>,

    pub publish_status: PublishStatus,
    pub product_image: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Units available for sale. Unstocked products have none.
    #[inline]
    pub fn available(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }

    /// Expired means the expiry day is strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiring_date.is_some_and(|d| d < today)
    }

    /// Whole days from `today` to the expiry date (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiring_date.map(|d| (d - today).num_days())
    }
}

/// Create payload for a product.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub category: Option<String>,
    pub product_name: Option<String>,
    pub price_cents: Option<i64>,
    pub notes: Option<String>,

    /// Accepts `productId` for compatibility with older dashboards.
    #[serde(alias = "productId")]
    pub product_code: Option<String>,

    #[ts(as = "Option<String>")]
    pub expiring_date: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub publish_status: Option<PublishStatus>,
    pub product_image: Option<String>,
}

impl NewProduct {
    /// Checks required fields and returns a trimmed copy.
    ///
    /// ## Rules
    /// - category, productName, price, notes are required
    /// - price and quantity must not be negative
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("category", non_blank(&self.category).is_some()),
            ("productName", non_blank(&self.product_name).is_some()),
            ("price", self.price_cents.is_some()),
            ("notes", non_blank(&self.notes).is_some()),
        ])?;
        validate_non_negative("price", self.price_cents.unwrap_or(0))?;
        validate_non_negative("quantity", self.quantity.unwrap_or(0))?;

        Ok(Self {
            category: non_blank(&self.category).map(String::from),
            product_name: non_blank(&self.product_name).map(String::from),
            notes: non_blank(&self.notes).map(String::from),
            product_code: non_blank(&self.product_code).map(String::from),
            product_image: non_blank(&self.product_image).map(String::from),
            ..self
        })
    }
}

/// Partial update for a product.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductUpdate {
    pub category: Option<String>,
    pub product_name: Option<String>,
    pub price_cents: Option<i64>,
    pub notes: Option<String>,

    #[serde(alias = "productId")]
    pub product_code: Option<String>,

    #[ts(as = "Option<String>")]
    pub expiring_date: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub publish_status: Option<PublishStatus>,
    pub product_image: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.product_name.is_none()
            && self.price_cents.is_none()
            && self.notes.is_none()
            && self.product_code.is_none()
            && self.expiring_date.is_none()
            && self.quantity.is_none()
            && self.publish_status.is_none()
            && self.product_image.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(price) = self.price_cents {
            validate_non_negative("price", price)?;
        }
        if let Some(quantity) = self.quantity {
            validate_non_negative("quantity", quantity)?;
        }
        Ok(())
    }
}

// =============================================================================
// Stock
// =============================================================================

/// A restock batch received from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: String,
    pub product_id: String,

    /// Generated 4-character code, unique across batches.
    pub product_code: String,

    pub quantity: i64,
    pub price_cents: i64,
    pub total_cents: i64,

    #[ts(as = "String")]
    pub date: NaiveDate,

    pub supplier: String,
    pub image: Option<String>,
    pub notes: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a restock batch. The product code is generated.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStock {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price_cents: Option<i64>,
    pub total_cents: Option<i64>,

    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,

    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub image: Option<String>,
}

impl NewStock {
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("productId", non_blank(&self.product_id).is_some()),
            ("quantity", self.quantity.is_some()),
            ("price", self.price_cents.is_some()),
            ("total", self.total_cents.is_some()),
            ("date", self.date.is_some()),
            ("supplier", non_blank(&self.supplier).is_some()),
            ("notes", non_blank(&self.notes).is_some()),
        ])?;

        let amounts = [self.quantity, self.price_cents, self.total_cents];
        if amounts.iter().flatten().any(|v| *v < 0) {
            return Err(ValidationError::Negative {
                field: "quantity, price, and total".to_string(),
            });
        }

        Ok(Self {
            product_id: non_blank(&self.product_id).map(String::from),
            supplier: non_blank(&self.supplier).map(String::from),
            notes: non_blank(&self.notes).map(String::from),
            image: non_blank(&self.image).map(String::from),
            ..self
        })
    }
}

/// Partial update for a restock batch.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct StockUpdate {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price_cents: Option<i64>,
    pub total_cents: Option<i64>,

    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,

    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub image: Option<String>,
}

impl StockUpdate {
    pub fn is_empty(&self) -> bool {
        self.product_id.is_none()
            && self.quantity.is_none()
            && self.price_cents.is_none()
            && self.total_cents.is_none()
            && self.date.is_none()
            && self.supplier.is_none()
            && self.notes.is_none()
            && self.image.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let amounts = [self.quantity, self.price_cents, self.total_cents];
        if amounts.iter().flatten().any(|v| *v < 0) {
            return Err(ValidationError::Negative {
                field: "quantity, price, and total".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_product_requires_fields() {
        let err = NewProduct {
            category: Some("Tablets".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "category, productName, price, notes are required"
        );
    }

    #[test]
    fn test_new_product_trims_and_drops_blank_code() {
        let product = NewProduct {
            category: Some("  Tablets ".into()),
            product_name: Some("Paracetamol".into()),
            price_cents: Some(250),
            notes: Some("500mg".into()),
            product_code: Some("   ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(product.category.as_deref(), Some("Tablets"));
        assert!(product.product_code.is_none());
    }

    #[test]
    fn test_product_code_accepts_legacy_key() {
        let input: NewProduct =
            serde_json::from_str(r#"{"productId":"PARA-500","priceCents":100}"#).unwrap();
        assert_eq!(input.product_code.as_deref(), Some("PARA-500"));
    }

    #[test]
    fn test_stock_rejects_negative_amounts() {
        let err = NewStock {
            product_id: Some("p1".into()),
            quantity: Some(-1),
            price_cents: Some(100),
            total_cents: Some(100),
            date: Some(day(2024, 1, 1)),
            supplier: Some("Acme".into()),
            notes: Some("batch".into()),
            image: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "quantity, price, and total must be non-negative");
    }

    #[test]
    fn test_expiry_helpers() {
        let now = Utc::now();
        let product = Product {
            id: "p1".into(),
            category: "Syrup".into(),
            product_name: "Cough Syrup".into(),
            product_code: None,
            price_cents: 900,
            notes: "".into(),
            expiring_date: Some(day(2024, 3, 10)),
            quantity: None,
            publish_status: PublishStatus::Yes,
            product_image: None,
            created_at: now,
            updated_at: now,
        };

        assert!(!product.is_expired(day(2024, 3, 10)));
        assert!(product.is_expired(day(2024, 3, 11)));
        assert_eq!(product.days_until_expiry(day(2024, 3, 1)), Some(9));
        assert_eq!(product.available(), 0);
    }
}
