use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{NewSupplier, Supplier, SupplierUpdate};

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, supplier: NewSupplier) -> DbResult<Supplier> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, "Creating supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, email, contact, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(supplier.name.unwrap_or_default())
        .bind(supplier.email.unwrap_or_default())
        .bind(supplier.contact.unwrap_or_default())
        .bind(supplier.address.unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(suppliers)
    }

    pub async fn update(&self, id: &str, update: &SupplierUpdate) -> DbResult<Supplier> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                contact = COALESCE(?, contact),
                address = COALESCE(?, address),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.contact)
        .bind(&update.address)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?")
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

    #[tokio::test]
    async fn test_crud() {
        let db = testing::db().await;
        let repo = db.suppliers();

        let supplier = repo
            .create(
                NewSupplier {
                    name: Some("Ernest Chemists".into()),
                    email: Some("sales@ernest.example".into()),
                    contact: Some("0302000000".into()),
                    address: Some("Spintex Road".into()),
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        let updated = repo
            .update(
                &supplier.id,
                &SupplierUpdate {
                    address: Some("Tema Industrial Area".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address, "Tema Industrial Area");
        assert_eq!(updated.email, "sales@ernest.example");

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.delete(&supplier.id).await.unwrap());
        assert!(!repo.delete(&supplier.id).await.unwrap());
    }
}
