//! Persists the alerts `pharmacy_core::alerts` decides a product deserves.
//! Repeated alerts coalesce into the product's open notification.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use pharmacy_core::alerts::{evaluate, evaluate_all, Alert};
use pharmacy_core::Product;
use pharmacy_db::{Database, DbResult};

async fn store(db: &Database, alerts: &[Alert]) -> DbResult<usize> {
    let notifications = db.notifications();
    for alert in alerts {
        notifications.upsert(alert).await?;
    }
    Ok(alerts.len())
}

/// On-write check after a product is created or updated. Failures are
/// logged and never fail the write.
pub async fn check_product(db: &Database, product: &Product, today: NaiveDate) {
    let alerts = evaluate(product, today);
    if alerts.is_empty() {
        return;
    }
    match store(db, &alerts).await {
        Ok(count) => debug!(product_id = %product.id, count, "Product alerts raised"),
        Err(e) => warn!(product_id = %product.id, error = %e, "Product alert check failed"),
    }
}

/// Periodic scan over the whole catalog. Returns the number of alerts
/// raised or refreshed.
pub async fn scan_all(db: &Database, today: NaiveDate) -> DbResult<usize> {
    let products = db.products().list().await?;
    let alerts = evaluate_all(&products, today);
    let count = store(db, &alerts).await?;
    info!(products = products.len(), alerts = count, "Notification scan finished");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmacy_core::{NewProduct, NotificationFilter, NotificationKind};
    use pharmacy_db::DbConfig;

    async fn product(db: &Database, name: &str, quantity: i64, expiring: Option<NaiveDate>) -> Product {
        db.products()
            .create(
                NewProduct {
                    category: Some("Syrup".into()),
                    product_name: Some(name.into()),
                    price_cents: Some(1_200),
                    notes: Some("100ml".into()),
                    quantity: Some(quantity),
                    expiring_date: expiring,
                    ..Default::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scan_coalesces_repeated_alerts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        product(&db, "Cough Syrup", 4, NaiveDate::from_ymd_opt(2024, 6, 10)).await;
        product(&db, "Vitamin C", 200, None).await;

        assert_eq!(scan_all(&db, today).await.unwrap(), 2);
        assert_eq!(scan_all(&db, today).await.unwrap(), 2);

        let notifications = db
            .notifications()
            .list(&NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(notifications.len(), 2);

        let mut kinds: Vec<_> = notifications.iter().map(|n| n.kind).collect();
        kinds.sort_by_key(|k| format!("{k:?}"));
        assert_eq!(kinds, vec![NotificationKind::Expiring, NotificationKind::LowStock]);
    }

    #[tokio::test]
    async fn test_check_product_without_alerts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let healthy = product(&db, "Vitamin C", 200, None).await;

        check_product(&db, &healthy, today).await;
        assert_eq!(db.notifications().unread_count().await.unwrap(), 0);

        let expired = product(&db, "Old Syrup", 50, NaiveDate::from_ymd_opt(2024, 5, 1)).await;
        check_product(&db, &expired, today).await;
        assert_eq!(db.notifications().unread_count().await.unwrap(), 1);
    }
}
