//! # Salary Repository
//!
//! One record per (employee, month). Posting a month that already has a
//! record updates its payment fields instead of failing.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{Salary, SalaryRequest, SalaryUpdate};

/// Whether [`SalaryRepository::upsert`] inserted or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalaryUpsert {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct SalaryRepository {
    pool: SqlitePool,
}

impl SalaryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SalaryRepository { pool }
    }

    /// Records a month's salary. An existing (employee, month) record gets
    /// the request's payment status, payment date and transaction id.
    pub async fn upsert(&self, request: &SalaryRequest) -> DbResult<(Salary, SalaryUpsert)> {
        let employee_id = request.employee_id.as_deref().unwrap_or_default();
        let month = request.month.as_deref().unwrap_or_default();
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM salaries WHERE employee_id = ? AND month = ?")
                .bind(employee_id)
                .bind(month)
                .fetch_optional(&mut *tx)
                .await?;

        let (id, outcome) = match existing {
            Some(id) => {
                debug!(id = %id, "Updating salary payment");
                sqlx::query(
                    r#"
                    UPDATE salaries SET
                        payment_status = ?, payment_date = ?, transaction_id = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(request.payment_status.unwrap_or_default())
                .bind(request.payment_date)
                .bind(&request.transaction_id)
                .bind(now)
                .bind(&id)
                .execute(&mut *tx)
                .await?;
                (id, SalaryUpsert::Updated)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                debug!(id = %id, employee_id = %employee_id, month = %month, "Creating salary");
                sqlx::query(
                    r#"
                    INSERT INTO salaries (
                        id, employee_id, month, year, payment_status, payment_date,
                        transaction_id, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(employee_id)
                .bind(month)
                .bind(request.year.unwrap_or_default())
                .bind(request.payment_status.unwrap_or_default())
                .bind(request.payment_date)
                .bind(&request.transaction_id)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                (id, SalaryUpsert::Created)
            }
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let salary = self
            .get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Salary", id))?;
        Ok((salary, outcome))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Salary>> {
        let salary = sqlx::query_as::<_, Salary>("SELECT * FROM salaries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(salary)
    }

    pub async fn list(&self) -> DbResult<Vec<Salary>> {
        let salaries =
            sqlx::query_as::<_, Salary>("SELECT * FROM salaries ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(salaries)
    }

    /// Partial update.
    ///
    /// ## Errors
    /// `UniqueViolation` when moving the record onto an (employee, month)
    /// pair that already has one.
    pub async fn update(&self, id: &str, update: &SalaryUpdate) -> DbResult<Salary> {
        let result = sqlx::query(
            r#"
            UPDATE salaries SET
                employee_id = COALESCE(?, employee_id),
                month = COALESCE(?, month),
                year = COALESCE(?, year),
                payment_status = COALESCE(?, payment_status),
                payment_date = COALESCE(?, payment_date),
                transaction_id = COALESCE(?, transaction_id),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.employee_id)
        .bind(&update.month)
        .bind(update.year)
        .bind(update.payment_status)
        .bind(update.payment_date)
        .bind(&update.transaction_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Salary", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Salary", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM salaries WHERE id = ?")
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
    use pharmacy_core::SalaryStatus;

    fn request(month: &str) -> SalaryRequest {
        SalaryRequest {
            employee_id: Some("emp-1".into()),
            month: Some(month.into()),
            year: Some(2024),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let db = testing::db().await;
        let repo = db.salaries();

        let (created, outcome) = repo.upsert(&request("March")).await.unwrap();
        assert_eq!(outcome, SalaryUpsert::Created);
        assert_eq!(created.payment_status, SalaryStatus::Unpaid);
        assert_eq!(created.payment_date, None);

        let paid = SalaryRequest {
            payment_status: Some(SalaryStatus::Paid),
            payment_date: NaiveDate::from_ymd_opt(2024, 3, 28),
            transaction_id: Some("TX-881".into()),
            ..request("March")
        };
        let (updated, outcome) = repo.upsert(&paid).await.unwrap();
        assert_eq!(outcome, SalaryUpsert::Updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.payment_status, SalaryStatus::Paid);
        assert_eq!(updated.transaction_id.as_deref(), Some("TX-881"));

        let (april, outcome) = repo.upsert(&request("April")).await.unwrap();
        assert_eq!(outcome, SalaryUpsert::Created);
        assert_ne!(april.id, created.id);
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_onto_taken_month() {
        let db = testing::db().await;
        let repo = db.salaries();
        repo.upsert(&request("March")).await.unwrap();
        let (april, _) = repo.upsert(&request("April")).await.unwrap();

        let err = repo
            .update(
                &april.id,
                &SalaryUpdate {
                    month: Some("March".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        assert!(repo.delete(&april.id).await.unwrap());
    }
}
