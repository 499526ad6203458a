//! # Stock Repository
//!
//! Restock batches. Each batch gets a generated 4-character product code
//! that is unique across all batches.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::codes::{random_stock_code, STOCK_CODE_MAX_ATTEMPTS};
use pharmacy_core::{NewStock, Stock, StockUpdate};

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    pub async fn code_exists(&self, code: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stocks WHERE product_code = ?")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Inserts a validated batch under a freshly generated code.
    ///
    /// ## Code Generation
    /// ```text
    /// attempt 1..=100: draw code ──► taken? ──yes──► next attempt
    ///                                   │no
    ///                                   ▼
    ///                               INSERT ──UNIQUE race──► next attempt
    /// exhausted ──► DbError::CodeSpaceExhausted
    /// ```
    pub async fn create(&self, stock: NewStock) -> DbResult<Stock> {
        self.create_with(stock, random_stock_code).await
    }

    async fn create_with(
        &self,
        stock: NewStock,
        mut next_code: impl FnMut() -> String,
    ) -> DbResult<Stock> {
        for _ in 0..STOCK_CODE_MAX_ATTEMPTS {
            let code = next_code();
            if self.code_exists(&code).await? {
                continue;
            }
            match self.insert(&stock, &code).await {
                Err(e) if e.is_unique_violation_on("stocks.product_code") => continue,
                other => return other,
            }
        }

        warn!("No free stock code after {} attempts", STOCK_CODE_MAX_ATTEMPTS);
        Err(DbError::CodeSpaceExhausted)
    }

    async fn insert(&self, stock: &NewStock, code: &str) -> DbResult<Stock> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, code = %code, "Creating stock batch");

        sqlx::query(
            r#"
            INSERT INTO stocks (
                id, product_id, product_code, quantity, price_cents, total_cents,
                date, supplier, image, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&stock.product_id)
        .bind(code)
        .bind(stock.quantity.unwrap_or_default())
        .bind(stock.price_cents.unwrap_or_default())
        .bind(stock.total_cents.unwrap_or_default())
        .bind(stock.date)
        .bind(&stock.supplier)
        .bind(&stock.image)
        .bind(&stock.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }

    /// All batches, newest first.
    pub async fn list(&self) -> DbResult<Vec<Stock>> {
        let stocks = sqlx::query_as::<_, Stock>("SELECT * FROM stocks ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(stocks)
    }

    pub async fn update(&self, id: &str, update: &StockUpdate) -> DbResult<Stock> {
        let result = sqlx::query(
            r#"
            UPDATE stocks SET
                product_id = COALESCE(?, product_id),
                quantity = COALESCE(?, quantity),
                price_cents = COALESCE(?, price_cents),
                total_cents = COALESCE(?, total_cents),
                date = COALESCE(?, date),
                supplier = COALESCE(?, supplier),
                notes = COALESCE(?, notes),
                image = COALESCE(?, image),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.product_id)
        .bind(update.quantity)
        .bind(update.price_cents)
        .bind(update.total_cents)
        .bind(update.date)
        .bind(&update.supplier)
        .bind(&update.notes)
        .bind(&update.image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM stocks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use chrono::NaiveDate;

    fn batch() -> NewStock {
        NewStock {
            product_id: Some("p1".into()),
            quantity: Some(100),
            price_cents: Some(200),
            total_cents: Some(20_000),
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            supplier: Some("Ernest Chemists".into()),
            notes: Some("June delivery".into()),
            image: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_generates_code() {
        let db = testing::db().await;
        let stock = db.stocks().create(batch()).await.unwrap();

        assert_eq!(stock.product_code.len(), 4);
        assert_eq!(stock.quantity, 100);
        assert_eq!(stock.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(db.stocks().code_exists(&stock.product_code).await.unwrap());
    }

    #[tokio::test]
    async fn test_taken_codes_are_skipped() {
        let db = testing::db().await;
        let repo = db.stocks();
        let first = repo.create_with(batch(), || "AAAA".to_string()).await.unwrap();
        assert_eq!(first.product_code, "AAAA");

        let mut codes = vec!["BBBB", "AAAA"].into_iter();
        let second = repo
            .create_with(batch(), || codes.next_back().unwrap_or("CCCC").to_string())
            .await
            .unwrap();
        assert_eq!(second.product_code, "BBBB");
    }

    #[tokio::test]
    async fn test_exhausted_code_space() {
        let db = testing::db().await;
        let repo = db.stocks();
        repo.create_with(batch(), || "ZZZZ".to_string()).await.unwrap();

        let err = repo
            .create_with(batch(), || "ZZZZ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CodeSpaceExhausted));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = testing::db().await;
        let stock = db.stocks().create(batch()).await.unwrap();

        let updated = db
            .stocks()
            .update(
                &stock.id,
                &StockUpdate {
                    quantity: Some(80),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 80);
        assert_eq!(updated.supplier, "Ernest Chemists");
        assert_eq!(updated.product_code, stock.product_code);
    }
}
