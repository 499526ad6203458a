//! # Order Repository
//!
//! Storefront orders. Stock moves only on status transitions, guarded by the
//! `inventory_adjusted` flag.
//!
//! ## Status Update
//! ```text
//! BEGIN
//!   load order                                   ── 404 if missing
//!   order_transition(adjusted, next status)
//!     Deduct  ─► UPDATE ... SET inventory_adjusted = 1 WHERE ... = 0
//!                  0 rows → someone else deducted, nothing to do
//!                  1 row  → check_order_stock, conditional decrements
//!     Restore ─► UPDATE ... SET inventory_adjusted = 0 WHERE ... = 1
//!                  1 row  → put the units back
//!   partial field update
//! COMMIT
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{load_by_ids, restore_stock, take_stock};
use pharmacy_core::inventory::{check_order_stock, order_movements, order_transition, InventoryAction};
use pharmacy_core::{Order, OrderDraft, OrderFilter, OrderItem, OrderUpdate};

/// Result of an order update: the stored order and what happened to stock.
#[derive(Debug, Clone)]
pub struct OrderTransition {
    pub order: Order,
    pub inventory: InventoryAction,
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Stores a priced order with its items. Status starts at `pending`.
    ///
    /// ## Errors
    /// `UniqueViolation` on `orders.order_number` or `orders.receipt_code`.
    pub async fn create(&self, draft: &OrderDraft) -> DbResult<Order> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, items = draft.items.len(), "Creating order");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, receipt_code, subtotal_cents, discount_cents, total_cents,
                payment_status, payment_reference, customer_name, customer_email,
                customer_phone, shipping_address, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.order_number)
        .bind(&draft.receipt_code)
        .bind(draft.subtotal_cents)
        .bind(draft.discount_cents)
        .bind(draft.total_cents)
        .bind(draft.payment_status)
        .bind(&draft.payment_reference)
        .bind(&draft.customer.name)
        .bind(&draft.customer.email)
        .bind(&draft.customer.phone)
        .bind(&draft.shipping_address.address)
        .bind(&draft.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, item) in draft.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, name, price_cents, quantity, image)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.price_cents)
            .bind(item.quantity)
            .bind(&item.image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, total_cents = draft.total_cents, "Order placed");
        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, id).await
    }

    /// Orders newest first, optionally filtered by status and payment status.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM orders WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(payment_status) = filter.payment_status {
            query.push(" AND payment_status = ").push_bind(payment_status);
        }
        query.push(" ORDER BY created_at DESC");

        let mut orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;

        let mut conn = self.pool.acquire().await?;
        for order in &mut orders {
            order.items = load_items(&mut conn, &order.id).await?;
        }
        Ok(orders)
    }

    /// Applies a status transition and partial update atomically.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown order
    /// - `Rule(ProductGone | InsufficientStock)` when completing an order
    ///   that can no longer be fulfilled
    /// - `StockConflict` when a concurrent sale took the units first
    pub async fn update(&self, id: &str, update: &OrderUpdate) -> DbResult<OrderTransition> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let order = load_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        let planned = order_transition(order.inventory_adjusted, update.status);
        let inventory = match planned {
            InventoryAction::Deduct => {
                if set_adjusted(&mut tx, id, true).await? {
                    deduct(&mut tx, &order.items).await?;
                    InventoryAction::Deduct
                } else {
                    InventoryAction::None
                }
            }
            InventoryAction::Restore => {
                if set_adjusted(&mut tx, id, false).await? {
                    for movement in order_movements(&order.items) {
                        restore_stock(&mut tx, &movement).await?;
                    }
                    InventoryAction::Restore
                } else {
                    InventoryAction::None
                }
            }
            InventoryAction::None => InventoryAction::None,
        };

        let customer = update.customer.clone().unwrap_or_default();
        sqlx::query(
            r#"
            UPDATE orders SET
                status = COALESCE(?, status),
                payment_status = COALESCE(?, payment_status),
                notes = COALESCE(?, notes),
                shipping_address = COALESCE(?, shipping_address),
                customer_name = COALESCE(?, customer_name),
                customer_email = COALESCE(?, customer_email),
                customer_phone = COALESCE(?, customer_phone),
                payment_reference = COALESCE(?, payment_reference),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status)
        .bind(update.payment_status)
        .bind(&update.notes)
        .bind(update.shipping_address.as_ref().and_then(|a| a.address.clone()))
        .bind(&customer.name)
        .bind(customer.email.map(|e| e.trim().to_lowercase()))
        .bind(&customer.phone)
        .bind(&update.payment_reference)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let order = load_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if inventory != InventoryAction::None {
            info!(id = %id, status = order.status.as_str(), action = ?inventory, "Order inventory adjusted");
        }
        Ok(OrderTransition { order, inventory })
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn load_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match order {
        Some(mut order) => {
            order.items = load_items(conn, &order.id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

async fn load_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT product_id, name, price_cents, quantity, image
        FROM order_items WHERE order_id = ? ORDER BY position
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Flips `inventory_adjusted` to `adjusted` if it currently holds the
/// opposite value. Returns whether this call made the flip.
async fn set_adjusted(conn: &mut SqliteConnection, id: &str, adjusted: bool) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE orders SET inventory_adjusted = ?, updated_at = ? WHERE id = ? AND inventory_adjusted = ?",
    )
    .bind(adjusted)
    .bind(Utc::now())
    .bind(id)
    .bind(!adjusted)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn deduct(conn: &mut SqliteConnection, items: &[OrderItem]) -> DbResult<()> {
    let movements = order_movements(items);
    let ids: Vec<String> = movements.iter().map(|m| m.product_id.clone()).collect();
    let products = load_by_ids(conn, &ids).await?;
    check_order_stock(items, &products)?;

    for movement in &movements {
        take_stock(conn, movement).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use crate::Database;
    use pharmacy_core::inventory::price_order;
    use pharmacy_core::{
        CoreError, OrderLineRequest, OrderPaymentStatus, OrderRequest, OrderStatus, Product,
    };

    async fn place(db: &Database, lines: &[(&Product, i64)]) -> Order {
        let request = OrderRequest {
            items: lines
                .iter()
                .map(|(p, q)| OrderLineRequest {
                    id: Some(p.id.clone()),
                    quantity: Some(*q),
                    ..Default::default()
                })
                .chain(std::iter::once(OrderLineRequest {
                    name: Some("Gift wrap".into()),
                    price_cents: Some(100),
                    ..Default::default()
                }))
                .collect(),
            ..Default::default()
        };
        let products: Vec<Product> = lines.iter().map(|(p, _)| (*p).clone()).collect();
        let draft = price_order(&request, &products).unwrap();
        db.orders().create(&draft).await.unwrap()
    }

    fn status(status: OrderStatus) -> OrderUpdate {
        OrderUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    async fn quantity(db: &Database, id: &str) -> Option<i64> {
        db.products().get(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 10).await;
        let order = place(&db, &[(&p, 2)]).await;

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].product_id, None);
        assert_eq!(order.subtotal_cents, 1100);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
        assert!(!order.inventory_adjusted);

        // Placing an order never moves stock.
        assert_eq!(quantity(&db, &p.id).await, Some(10));
    }

    #[tokio::test]
    async fn test_completion_deducts_once() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 10).await;
        let order = place(&db, &[(&p, 3)]).await;

        let first = db.orders().update(&order.id, &status(OrderStatus::Completed)).await.unwrap();
        assert_eq!(first.inventory, InventoryAction::Deduct);
        assert!(first.order.inventory_adjusted);
        assert_eq!(quantity(&db, &p.id).await, Some(7));

        let again = db.orders().update(&order.id, &status(OrderStatus::Completed)).await.unwrap();
        assert_eq!(again.inventory, InventoryAction::None);
        assert_eq!(quantity(&db, &p.id).await, Some(7));
    }

    #[tokio::test]
    async fn test_cancellation_restores_once() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 10).await;
        let order = place(&db, &[(&p, 3)]).await;

        // Cancelling before completion never touched stock.
        let early = db.orders().update(&order.id, &status(OrderStatus::Cancelled)).await.unwrap();
        assert_eq!(early.inventory, InventoryAction::None);

        db.orders().update(&order.id, &status(OrderStatus::Completed)).await.unwrap();
        let cancelled = db.orders().update(&order.id, &status(OrderStatus::Cancelled)).await.unwrap();
        assert_eq!(cancelled.inventory, InventoryAction::Restore);
        assert!(!cancelled.order.inventory_adjusted);
        assert_eq!(quantity(&db, &p.id).await, Some(10));

        let again = db.orders().update(&order.id, &status(OrderStatus::Cancelled)).await.unwrap();
        assert_eq!(again.inventory, InventoryAction::None);
        assert_eq!(quantity(&db, &p.id).await, Some(10));
    }

    #[tokio::test]
    async fn test_completion_checks_stock_and_rolls_back() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 2).await;
        let order = place(&db, &[(&p, 3)]).await;

        let err = db
            .orders()
            .update(&order.id, &status(OrderStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));

        let order = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.inventory_adjusted);
        assert_eq!(quantity(&db, &p.id).await, Some(2));
    }

    #[tokio::test]
    async fn test_completion_with_deleted_product() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 10).await;
        let order = place(&db, &[(&p, 1)]).await;
        db.products().delete(&p.id).await.unwrap();

        let err = db
            .orders()
            .update(&order.id, &status(OrderStatus::Completed))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Product {} no longer exists", p.id));
    }

    #[tokio::test]
    async fn test_partial_update_and_filters() {
        let db = testing::db().await;
        let p = testing::product(&db, "Vitamin C", 500, 10).await;
        let order = place(&db, &[(&p, 1)]).await;
        place(&db, &[(&p, 1)]).await;

        let updated = db
            .orders()
            .update(
                &order.id,
                &OrderUpdate {
                    payment_status: Some(OrderPaymentStatus::Paid),
                    notes: Some("Leave at reception".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.order.payment_status, OrderPaymentStatus::Paid);
        assert_eq!(updated.order.status, OrderStatus::Pending);

        let paid = db
            .orders()
            .list(&OrderFilter {
                payment_status: Some(OrderPaymentStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].notes.as_deref(), Some("Leave at reception"));

        assert_eq!(db.orders().list(&OrderFilter::default()).await.unwrap().len(), 2);

        let err = db.orders().update("missing", &OrderUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
