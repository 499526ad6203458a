use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{Customer, CustomerUpdate, NewCustomer};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer that passed [`NewCustomer::validate`].
    pub async fn create(&self, customer: NewCustomer) -> DbResult<Customer> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, business_address, contact, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(customer.name.unwrap_or_default())
        .bind(customer.business_address.unwrap_or_default())
        .bind(customer.contact.unwrap_or_default())
        .bind(customer.email.unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(customers)
    }

    pub async fn update(&self, id: &str, update: &CustomerUpdate) -> DbResult<Customer> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?, name),
                business_address = COALESCE(?, business_address),
                contact = COALESCE(?, contact),
                email = COALESCE(?, email),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.business_address)
        .bind(&update.contact)
        .bind(&update.email)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
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

    fn customer(name: &str) -> NewCustomer {
        NewCustomer {
            name: Some(name.into()),
            business_address: Some("14 Oxford Street, Osu".into()),
            contact: Some("0244123456".into()),
            email: Some("Buyer@Example.com".into()),
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_crud() {
        let db = testing::db().await;
        let repo = db.customers();

        let created = repo.create(customer("Osu Clinic")).await.unwrap();
        assert_eq!(created.email, "buyer@example.com");
        repo.create(customer("Labone Clinic")).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 2);

        let update = CustomerUpdate {
            contact: Some("0501112222".into()),
            ..Default::default()
        };
        let updated = repo.update(&created.id, &update).await.unwrap();
        assert_eq!(updated.contact, "0501112222");
        assert_eq!(updated.name, "Osu Clinic");

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(repo.get(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.update(&created.id, &update).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
