//! # Sale Repository
//!
//! Walk-in sales and their line items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one unit of work)                                          │
//! │     ├── load products, price_sale()  → SaleDraft                       │
//! │     ├── next SALE-YYYYMMDD-NNNN                                        │
//! │     ├── INSERT sale + sale_items     (status: completed)               │
//! │     └── conditional decrement per product                              │
//! │                                                                         │
//! │     failure ─┬─ transaction mode: ROLLBACK                              │
//! │              └─ direct mode: restore deducted units, DELETE sale        │
//! │                                                                         │
//! │  2. (OPTIONAL) PATCH                                                   │
//! │     └── notes / payment fields, never refunded, never stock            │
//! │                                                                         │
//! │  3. (OPTIONAL) REFUND                                                  │
//! │     ├── flip status → refunded   (only if not refunded yet)           │
//! │     └── restore every item's units                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{load_by_ids, restore_stock, take_stock};
use crate::unit::UnitOfWork;
use pharmacy_core::codes::{sale_number, sale_number_prefix};
use pharmacy_core::inventory::{price_sale, sale_movements, StockMovement};
use pharmacy_core::stats::Window;
use pharmacy_core::{
    Pagination, Sale, SaleFilter, SaleItem, SalePaymentStatus, SaleRequest, SaleUpdate,
};

/// How often a colliding sale number is retried before giving up.
const SALE_NUMBER_ATTEMPTS: i64 = 5;

const SALE_COLUMNS: &str = r#"
    s.id, s.sale_number, s.subtotal_cents, s.discount_cents, s.total_amount_cents,
    s.payment_method, s.payment_status, s.cashier_id, u.name AS cashier_name,
    s.notes, s.created_at, s.updated_at
"#;

/// What a failed direct-mode unit has written so far.
#[derive(Debug, Default)]
struct Written {
    sale_id: Option<String>,
    deducted: Vec<StockMovement>,
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Prices, records and deducts a sale as one unit of work.
    ///
    /// ## Arguments
    /// * `request` - the submitted cart
    /// * `cashier_id` - the authenticated user
    /// * `today` - UTC day used for expiry checks and the sale number
    /// * `transactional` - run inside a transaction instead of compensating
    ///
    /// ## Errors
    /// - `Rule(CoreError)` for cart, product, expiry and stock rules
    /// - `StockConflict` when a concurrent writer took the units first
    pub async fn create(
        &self,
        request: &SaleRequest,
        cashier_id: &str,
        today: NaiveDate,
        transactional: bool,
    ) -> DbResult<Sale> {
        let mut attempt = 0;
        loop {
            match self.create_once(request, cashier_id, today, transactional, attempt).await {
                Err(e)
                    if e.is_unique_violation_on("sales.sale_number")
                        && attempt + 1 < SALE_NUMBER_ATTEMPTS =>
                {
                    warn!(attempt, "Sale number collision, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn create_once(
        &self,
        request: &SaleRequest,
        cashier_id: &str,
        today: NaiveDate,
        transactional: bool,
        attempt: i64,
    ) -> DbResult<Sale> {
        let mut unit = UnitOfWork::begin(&self.pool, transactional).await?;
        let mut written = Written::default();

        let result = write_sale(
            unit.conn(),
            request,
            cashier_id,
            today,
            attempt,
            &mut written,
        )
        .await;

        match result {
            Ok(sale_id) => {
                unit.commit().await?;
                let sale = self
                    .get(&sale_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
                info!(
                    sale_number = %sale.sale_number,
                    total_cents = sale.total_amount_cents,
                    "Sale completed"
                );
                Ok(sale)
            }
            Err(e) => {
                if let Some(mut conn) = unit.rollback().await {
                    compensate(&mut conn, &written).await;
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales s LEFT JOIN users u ON u.id = s.cashier_id WHERE s.id = ?"
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.items = self.items(&sale.id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT product_id, product_name, quantity, unit_price_cents, total_price_cents
            FROM sale_items WHERE sale_id = ? ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn with_items(&self, mut sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        for sale in &mut sales {
            sale.items = self.items(&sale.id).await?;
        }
        Ok(sales)
    }

    /// One page of sales, newest first.
    ///
    /// ## Filters
    /// - `start_date` / `end_date`: whole UTC days, both inclusive
    /// - `payment_method`: ignored when `all` or unknown
    /// - `search`: substring of the sale number or notes
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<(Vec<Sale>, Pagination)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales s WHERE 1 = 1");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SALE_COLUMNS} FROM sales s LEFT JOIN users u ON u.id = s.cashier_id WHERE 1 = 1"
        ));
        push_filters(&mut page, filter);
        page.push(" ORDER BY s.created_at DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());
        let sales = page.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        let sales = self.with_items(sales).await?;
        Ok((sales, Pagination::new(total, filter.page(), filter.limit())))
    }

    /// Completed sales created inside `window`, with their items.
    pub async fn completed_in(&self, window: Window) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales s LEFT JOIN users u ON u.id = s.cashier_id
            WHERE s.payment_status = ? AND s.created_at >= ? AND s.created_at < ?
            ORDER BY s.created_at
            "#
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(SalePaymentStatus::Completed)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(sales).await
    }

    // =========================================================================
    // Update & Refund
    // =========================================================================

    /// Applies a partial update. Stock is never touched here.
    ///
    /// A refunded sale is final: updating it fails with `AlreadyRefunded`.
    pub async fn update(&self, id: &str, update: &SaleUpdate) -> DbResult<Sale> {
        debug!(id = %id, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                payment_status = COALESCE(?, payment_status),
                payment_method = COALESCE(?, payment_method),
                notes = COALESCE(?, notes),
                discount_cents = COALESCE(?, discount_cents),
                subtotal_cents = COALESCE(?, subtotal_cents),
                total_amount_cents = COALESCE(?, total_amount_cents),
                updated_at = ?
            WHERE id = ? AND payment_status != ?
            "#,
        )
        .bind(update.payment_status)
        .bind(update.payment_method)
        .bind(&update.notes)
        .bind(update.discount_cents)
        .bind(update.subtotal_cents)
        .bind(update.total_amount_cents)
        .bind(Utc::now())
        .bind(id)
        .bind(SalePaymentStatus::Refunded)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get(id).await? {
                Some(_) => DbError::AlreadyRefunded,
                None => DbError::not_found("Sale", id),
            });
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Refunds a sale and restores its units.
    ///
    /// The status flip is conditional, so of two concurrent refunds only one
    /// restores stock; the other sees `AlreadyRefunded`.
    pub async fn refund(&self, id: &str) -> DbResult<Sale> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let flipped = sqlx::query(
            "UPDATE sales SET payment_status = ?, updated_at = ? WHERE id = ? AND payment_status != ?",
        )
        .bind(SalePaymentStatus::Refunded)
        .bind(Utc::now())
        .bind(id)
        .bind(SalePaymentStatus::Refunded)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists > 0 {
                DbError::AlreadyRefunded
            } else {
                DbError::not_found("Sale", id)
            });
        }

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT product_id, product_name, quantity, unit_price_cents, total_price_cents
            FROM sale_items WHERE sale_id = ? ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for movement in sale_movements(&items) {
            restore_stock(&mut tx, &movement).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, "Sale refunded");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }
}

// =============================================================================
// Unit-of-work steps
// =============================================================================

/// Writes the sale on `conn` and returns its id. Progress is recorded in
/// `written` so a direct-mode caller can undo it.
async fn write_sale(
    conn: &mut SqliteConnection,
    request: &SaleRequest,
    cashier_id: &str,
    today: NaiveDate,
    attempt: i64,
    written: &mut Written,
) -> DbResult<String> {
    let ids: Vec<String> = request.items.iter().map(|l| l.product_id.clone()).collect();
    let products = load_by_ids(conn, &ids).await?;
    let draft = price_sale(request, &products, today)?;

    let prefix = format!("{}%", sale_number_prefix(today));
    let sales_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE sale_number LIKE ?")
            .bind(&prefix)
            .fetch_one(&mut *conn)
            .await?;
    let number = sale_number(today, sales_today + attempt);

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    debug!(id = %id, sale_number = %number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_number, subtotal_cents, discount_cents, total_amount_cents,
            payment_method, payment_status, cashier_id, notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&number)
    .bind(draft.subtotal.cents())
    .bind(draft.discount.cents())
    .bind(draft.total.cents())
    .bind(draft.payment_method)
    .bind(SalePaymentStatus::Completed)
    .bind(cashier_id)
    .bind(&draft.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    written.sale_id = Some(id.clone());

    for (position, item) in draft.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, position, product_id, product_name,
                quantity, unit_price_cents, total_price_cents
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .execute(&mut *conn)
        .await?;
    }

    for movement in sale_movements(&draft.items) {
        take_stock(conn, &movement).await?;
        written.deducted.push(movement);
    }

    Ok(id)
}

/// Undoes a failed direct-mode sale: units first, then the sale row
/// (its items cascade).
async fn compensate(conn: &mut SqliteConnection, written: &Written) {
    for movement in &written.deducted {
        if let Err(e) = restore_stock(conn, movement).await {
            error!(product_id = %movement.product_id, error = %e, "Failed to restore stock");
        }
    }

    if let Some(sale_id) = &written.sale_id {
        if let Err(e) = sqlx::query("DELETE FROM sales WHERE id = ?")
            .bind(sale_id)
            .execute(&mut *conn)
            .await
        {
            error!(sale_id = %sale_id, error = %e, "Failed to delete sale");
        }
    }

    if written.sale_id.is_some() {
        warn!(
            restored = written.deducted.len(),
            "Sale rolled back by compensation"
        );
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    if let Some(start) = filter.start_date {
        query.push(" AND s.created_at >= ").push_bind(start_of(start));
    }
    if let Some(end) = filter.end_date {
        query
            .push(" AND s.created_at < ")
            .push_bind(start_of(end + Duration::days(1)));
    }
    if let Some(method) = filter.payment_method() {
        query.push(" AND s.payment_method = ").push_bind(method);
    }
    if let Some(search) = filter.search() {
        let pattern = format!("%{search}%");
        query
            .push(" AND (s.sale_number LIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.notes LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
