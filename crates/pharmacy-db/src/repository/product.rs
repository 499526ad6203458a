//! # Product Repository
//!
//! Catalog CRUD plus the two stock primitives every inventory flow goes
//! through.
//!
//! ## Conditional Decrement
//! ```text
//! UPDATE products SET quantity = quantity - :n
//! WHERE id = :id AND quantity >= :n
//!        │
//!        ├── 1 row  → units taken
//!        └── 0 rows → gone, unstocked, or a concurrent writer got there
//!                     first → DbError::StockConflict
//! ```
//! Two concurrent sales of the last unit cannot both succeed, and the
//! `CHECK (quantity >= 0)` column constraint backs this up.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::inventory::StockMovement;
use pharmacy_core::{NewProduct, Product, ProductUpdate, PublishStatus};

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a validated product.
    ///
    /// ## Errors
    /// `UniqueViolation` on `products.product_code`.
    pub async fn create(&self, product: NewProduct) -> DbResult<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = ?product.product_name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, category, product_name, product_code, price_cents, notes,
                expiring_date, quantity, publish_status, product_image,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(product.category.unwrap_or_default())
        .bind(product.product_name.unwrap_or_default())
        .bind(&product.product_code)
        .bind(product.price_cents.unwrap_or_default())
        .bind(product.notes.unwrap_or_default())
        .bind(product.expiring_date)
        .bind(product.quantity)
        .bind(product.publish_status.unwrap_or_default())
        .bind(&product.product_image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// All products, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    /// Storefront listing: published products only, optionally only those
    /// with units on hand.
    pub async fn list_published(&self, in_stock_only: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE publish_status = ?
              AND (? = 0 OR COALESCE(quantity, 0) > 0)
            ORDER BY created_at DESC
            "#,
        )
        .bind(PublishStatus::Yes)
        .bind(in_stock_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn get_published(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ? AND publish_status = ?",
        )
        .bind(id)
        .bind(PublishStatus::Yes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Products matching any of `references` by id or product code.
    pub async fn find_by_references(&self, references: &[&str]) -> DbResult<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();
        for reference in references {
            let found = sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE id = ? OR product_code = ?",
            )
            .bind(*reference)
            .bind(*reference)
            .fetch_all(&self.pool)
            .await?;
            for product in found {
                if !products.iter().any(|p| p.id == product.id) {
                    products.push(product);
                }
            }
        }
        Ok(products)
    }

    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                category = COALESCE(?, category),
                product_name = COALESCE(?, product_name),
                price_cents = COALESCE(?, price_cents),
                notes = COALESCE(?, notes),
                product_code = COALESCE(?, product_code),
                expiring_date = COALESCE(?, expiring_date),
                quantity = COALESCE(?, quantity),
                publish_status = COALESCE(?, publish_status),
                product_image = COALESCE(?, product_image),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.category)
        .bind(&update.product_name)
        .bind(update.price_cents)
        .bind(&update.notes)
        .bind(&update.product_code)
        .bind(update.expiring_date)
        .bind(update.quantity)
        .bind(update.publish_status)
        .bind(&update.product_image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Connection-level helpers (used inside units of work)
// =============================================================================

/// Loads the products with the given ids on `conn`. Unknown ids are skipped.
pub(crate) async fn load_by_ids(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> DbResult<Vec<Product>> {
    let mut products = Vec::with_capacity(ids.len());
    for id in ids {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(product) = product {
            if !products.iter().any(|p: &Product| p.id == product.id) {
                products.push(product);
            }
        }
    }
    Ok(products)
}

/// Takes `movement.quantity` units out of stock, only if that many remain.
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET quantity = quantity - ?, updated_at = ?
        WHERE id = ? AND quantity >= ?
        "#,
    )
    .bind(movement.quantity)
    .bind(Utc::now())
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockConflict {
            product_id: movement.product_id.clone(),
            requested: movement.quantity,
        });
    }
    Ok(())
}

/// Puts units back. A product deleted in the meantime is skipped.
pub(crate) async fn restore_stock(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE products SET quantity = COALESCE(quantity, 0) + ?, updated_at = ? WHERE id = ?",
    )
    .bind(movement.quantity)
    .bind(Utc::now())
    .bind(&movement.product_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
