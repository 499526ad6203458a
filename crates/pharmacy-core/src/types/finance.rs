use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::non_blank;
use crate::error::ValidationError;
use crate::validation::{require_fields, validate_non_negative, ValidationResult};

// =============================================================================
// Salary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SalaryStatus {
    Paid,
    #[default]
    Unpaid,
}

/// One month's salary record for an employee. Unique per (employee, month).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub id: String,
    pub employee_id: String,
    pub month: String,
    pub year: i32,
    pub payment_status: SalaryStatus,

    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,

    pub transaction_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/salaries`. Posting an existing (employee, month)
/// updates that record instead of creating a new one.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryRequest {
    pub employee_id: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub payment_status: Option<SalaryStatus>,

    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,

    pub transaction_id: Option<String>,
}

impl SalaryRequest {
    pub fn validate(self) -> ValidationResult<Self> {
        if non_blank(&self.employee_id).is_none()
            || non_blank(&self.month).is_none()
            || self.year.is_none()
        {
            return Err(ValidationError::required_together(&[
                "employeeId",
                "month",
                "year",
            ]));
        }
        Ok(Self {
            employee_id: non_blank(&self.employee_id).map(String::from),
            month: non_blank(&self.month).map(String::from),
            transaction_id: non_blank(&self.transaction_id).map(String::from),
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryUpdate {
    pub employee_id: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub payment_status: Option<SalaryStatus>,

    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,

    pub transaction_id: Option<String>,
}

impl SalaryUpdate {
    pub fn is_empty(&self) -> bool {
        self.employee_id.is_none()
            && self.month.is_none()
            && self.year.is_none()
            && self.payment_status.is_none()
            && self.payment_date.is_none()
            && self.transaction_id.is_none()
    }
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub item: String,
    pub description: String,
    pub amount_cents: i64,
    pub submitted_by: String,

    #[ts(as = "String")]
    pub date: NaiveDate,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewExpense {
    pub item: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub submitted_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

impl NewExpense {
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("item", non_blank(&self.item).is_some()),
            ("description", non_blank(&self.description).is_some()),
            ("amount", self.amount_cents.is_some()),
            ("submittedBy", non_blank(&self.submitted_by).is_some()),
            ("date", self.date.is_some()),
        ])?;
        validate_non_negative("amount", self.amount_cents.unwrap_or(0))?;
        Ok(Self {
            item: non_blank(&self.item).map(String::from),
            description: non_blank(&self.description).map(String::from),
            submitted_by: non_blank(&self.submitted_by).map(String::from),
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseUpdate {
    pub item: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub submitted_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

impl ExpenseUpdate {
    pub fn normalized(self) -> ValidationResult<Option<Self>> {
        if let Some(amount) = self.amount_cents {
            validate_non_negative("amount", amount)?;
        }
        let update = Self {
            item: non_blank(&self.item).map(String::from),
            description: non_blank(&self.description).map(String::from),
            submitted_by: non_blank(&self.submitted_by).map(String::from),
            ..self
        };
        let empty = update.item.is_none()
            && update.description.is_none()
            && update.amount_cents.is_none()
            && update.submitted_by.is_none()
            && update.date.is_none();
        Ok((!empty).then_some(update))
    }
}
