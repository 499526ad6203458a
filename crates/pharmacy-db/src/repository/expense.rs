use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{Expense, ExpenseUpdate, NewExpense};

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn create(&self, expense: NewExpense) -> DbResult<Expense> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, amount_cents = ?expense.amount_cents, "Recording expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, item, description, amount_cents, submitted_by, date, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(expense.item.unwrap_or_default())
        .bind(expense.description.unwrap_or_default())
        .bind(expense.amount_cents.unwrap_or_default())
        .bind(expense.submitted_by.unwrap_or_default())
        .bind(expense.date.unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    /// Newest expense date first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses ORDER BY date DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }

    pub async fn update(&self, id: &str, update: &ExpenseUpdate) -> DbResult<Expense> {
        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                item = COALESCE(?, item),
                description = COALESCE(?, description),
                amount_cents = COALESCE(?, amount_cents),
                submitted_by = COALESCE(?, submitted_by),
                date = COALESCE(?, date),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.item)
        .bind(&update.description)
        .bind(update.amount_cents)
        .bind(&update.submitted_by)
        .bind(update.date)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
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

    fn expense(item: &str, day: u32) -> NewExpense {
        NewExpense {
            item: Some(item.into()),
            description: Some("Shop supplies".into()),
            amount_cents: Some(4_500),
            submitted_by: Some("ama".into()),
            date: NaiveDate::from_ymd_opt(2024, 5, day),
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_orders_by_date() {
        let db = testing::db().await;
        let repo = db.expenses();
        repo.create(expense("Printer ink", 3)).await.unwrap();
        repo.create(expense("Cleaning", 20)).await.unwrap();

        let items: Vec<_> = repo.list().await.unwrap().into_iter().map(|e| e.item).collect();
        assert_eq!(items, vec!["Cleaning", "Printer ink"]);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = testing::db().await;
        let repo = db.expenses();
        let created = repo.create(expense("Printer ink", 3)).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                &ExpenseUpdate {
                    amount_cents: Some(5_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 5_000);
        assert_eq!(updated.item, "Printer ink");
        assert_eq!(updated.date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    }
}
