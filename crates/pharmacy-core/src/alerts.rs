//! # Stock & Expiry Alerts
//!
//! Decides which notifications a product should raise. Persisting them (and
//! coalescing with existing unread ones) is the repository's job.
//!
//! ```text
//! quantity < 10                      ──► low_stock
//! expiring_date < today              ──► expired
//! today ≤ expiring_date ≤ today+30d  ──► expiring
//! ```
//!
//! Dates are compared at day granularity.

use chrono::NaiveDate;

use crate::types::{NotificationKind, NotificationMetadata, Product};
use crate::{EXPIRING_DAYS_THRESHOLD, LOW_STOCK_THRESHOLD};

/// A notification a product currently deserves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: NotificationKind,
    pub product_id: String,
    pub product_name: String,
    pub message: String,
    pub metadata: NotificationMetadata,
}

/// Evaluates one product against the low-stock and expiry thresholds.
///
/// Returns at most two alerts: one stock alert and one expiry alert.
pub fn evaluate(product: &Product, today: NaiveDate) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let name = &product.product_name;

    if let Some(quantity) = product.quantity.filter(|q| *q < LOW_STOCK_THRESHOLD) {
        alerts.push(Alert {
            kind: NotificationKind::LowStock,
            product_id: product.id.clone(),
            product_name: name.clone(),
            message: format!("{name} is low on stock ({quantity} remaining)"),
            metadata: NotificationMetadata {
                quantity: Some(quantity),
                ..Default::default()
            },
        });
    }

    if let Some(expiring_date) = product.expiring_date {
        let days = (expiring_date - today).num_days();
        let date = expiring_date.format("%Y-%m-%d");
        let metadata = NotificationMetadata {
            quantity: None,
            expiring_date: Some(expiring_date),
            days_until_expiry: Some(days),
        };

        if days < 0 {
            alerts.push(Alert {
                kind: NotificationKind::Expired,
                product_id: product.id.clone(),
                product_name: name.clone(),
                message: format!("{name} has expired on {date}"),
                metadata,
            });
        } else if days <= EXPIRING_DAYS_THRESHOLD {
            let plural = if days == 1 { "" } else { "s" };
            alerts.push(Alert {
                kind: NotificationKind::Expiring,
                product_id: product.id.clone(),
                product_name: name.clone(),
                message: format!("{name} will expire in {days} day{plural} ({date})"),
                metadata,
            });
        }
    }

    alerts
}

/// Evaluates every product; the periodic scan feeds this into the
/// notification repository.
pub fn evaluate_all<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    today: NaiveDate,
) -> Vec<Alert> {
    products
        .into_iter()
        .flat_map(|p| evaluate(p, today))
        .collect()
}
