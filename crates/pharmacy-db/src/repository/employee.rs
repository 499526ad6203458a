use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmacy_core::{Employee, EmployeeUpdate, NewEmployee};

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Inserts an employee that passed [`NewEmployee::validate`]; every
    /// field is present by then.
    pub async fn create(&self, employee: NewEmployee) -> DbResult<Employee> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, "Creating employee");

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, name, address, email, contact, position, branch, education_level,
                department, gender, nationality, cv, status, start_date, end_date,
                salary_cents, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(employee.name.unwrap_or_default())
        .bind(employee.address.unwrap_or_default())
        .bind(employee.email.unwrap_or_default())
        .bind(employee.contact.unwrap_or_default())
        .bind(employee.position.unwrap_or_default())
        .bind(employee.branch.unwrap_or_default())
        .bind(employee.education_level.unwrap_or_default())
        .bind(employee.department.unwrap_or_default())
        .bind(employee.gender.unwrap_or_default())
        .bind(employee.nationality.unwrap_or_default())
        .bind(employee.cv.unwrap_or_default())
        .bind(employee.status.unwrap_or_default())
        .bind(employee.start_date.unwrap_or_default())
        .bind(employee.end_date.unwrap_or_default())
        .bind(employee.salary_cents.unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    pub async fn list(&self) -> DbResult<Vec<Employee>> {
        let employees =
            sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(employees)
    }

    pub async fn update(&self, id: &str, update: &EmployeeUpdate) -> DbResult<Employee> {
        let result = sqlx::query(
            r#"
            UPDATE employees SET
                name = COALESCE(?, name),
                address = COALESCE(?, address),
                email = COALESCE(?, email),
                contact = COALESCE(?, contact),
                position = COALESCE(?, position),
                branch = COALESCE(?, branch),
                education_level = COALESCE(?, education_level),
                department = COALESCE(?, department),
                gender = COALESCE(?, gender),
                nationality = COALESCE(?, nationality),
                cv = COALESCE(?, cv),
                status = COALESCE(?, status),
                start_date = COALESCE(?, start_date),
                end_date = COALESCE(?, end_date),
                salary_cents = COALESCE(?, salary_cents),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.address)
        .bind(&update.email)
        .bind(&update.contact)
        .bind(&update.position)
        .bind(&update.branch)
        .bind(&update.education_level)
        .bind(&update.department)
        .bind(&update.gender)
        .bind(&update.nationality)
        .bind(&update.cv)
        .bind(&update.status)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.salary_cents)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
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

    fn employee() -> NewEmployee {
        NewEmployee {
            name: Some("Akosua Boateng".into()),
            address: Some("East Legon".into()),
            email: Some("akosua@example.com".into()),
            contact: Some("0207000000".into()),
            position: Some("Pharmacist".into()),
            branch: Some("Accra Central".into()),
            education_level: Some("PharmD".into()),
            department: Some("Dispensary".into()),
            gender: Some("Female".into()),
            nationality: Some("Ghanaian".into()),
            cv: Some("akosua-cv.pdf".into()),
            status: Some("Active".into()),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 9),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 8),
            salary_cents: Some(450_000),
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_crud() {
        let db = testing::db().await;
        let repo = db.employees();

        let created = repo.create(employee()).await.unwrap();
        assert_eq!(created.position, "Pharmacist");
        assert_eq!(created.start_date, NaiveDate::from_ymd_opt(2023, 1, 9).unwrap());

        let updated = repo
            .update(
                &created.id,
                &EmployeeUpdate {
                    position: Some("Senior Pharmacist".into()),
                    salary_cents: Some(520_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.position, "Senior Pharmacist");
        assert_eq!(updated.salary_cents, 520_000);
        assert_eq!(updated.branch, "Accra Central");

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.delete(&created.id).await.unwrap());
        assert!(repo.get(&created.id).await.unwrap().is_none());
    }
}
