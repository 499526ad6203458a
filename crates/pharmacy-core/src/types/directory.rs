//! Customers, employees and suppliers: plain records with required-field
//! validation and allow-list updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::non_blank;
use crate::validation::{require_fields, validate_email, validate_non_negative, ValidationResult};

fn trimmed(value: &Option<String>) -> Option<String> {
    non_blank(value).map(String::from)
}

fn email(value: &Option<String>) -> Option<String> {
    non_blank(value).map(str::to_lowercase)
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub business_address: String,
    pub contact: String,
    pub email: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCustomer {
    pub name: Option<String>,
    pub business_address: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
}

impl NewCustomer {
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("name", non_blank(&self.name).is_some()),
            ("businessAddress", non_blank(&self.business_address).is_some()),
            ("contact", non_blank(&self.contact).is_some()),
            ("email", non_blank(&self.email).is_some()),
        ])?;
        let email = email(&self.email);
        validate_email(email.as_deref().unwrap_or_default())?;

        Ok(Self {
            name: trimmed(&self.name),
            business_address: trimmed(&self.business_address),
            contact: trimmed(&self.contact),
            email,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub business_address: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
}

impl CustomerUpdate {
    /// Drops blank values and normalises the email. Returns `None` when
    /// nothing is left to update.
    pub fn normalized(self) -> ValidationResult<Option<Self>> {
        let update = Self {
            name: trimmed(&self.name),
            business_address: trimmed(&self.business_address),
            contact: trimmed(&self.contact),
            email: email(&self.email),
        };
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        let empty = update.name.is_none()
            && update.business_address.is_none()
            && update.contact.is_none()
            && update.email.is_none();
        Ok((!empty).then_some(update))
    }
}

// =============================================================================
// Employee
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub address: String,
    pub email: String,
    pub contact: String,
    pub position: String,
    pub branch: String,
    pub education_level: String,
    pub department: String,
    pub gender: String,
    pub nationality: String,

    /// Link to, or name of, the uploaded CV.
    pub cv: String,

    pub status: String,

    #[ts(as = "String")]
    pub start_date: NaiveDate,

    #[ts(as = "String")]
    pub end_date: NaiveDate,

    pub salary_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEmployee {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub position: Option<String>,
    pub branch: Option<String>,
    pub education_level: Option<String>,
    pub department: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub cv: Option<String>,
    pub status: Option<String>,

    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,

    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,

    pub salary_cents: Option<i64>,
}

impl NewEmployee {
    /// Every employee field is required.
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("name", non_blank(&self.name).is_some()),
            ("address", non_blank(&self.address).is_some()),
            ("email", non_blank(&self.email).is_some()),
            ("contact", non_blank(&self.contact).is_some()),
            ("position", non_blank(&self.position).is_some()),
            ("branch", non_blank(&self.branch).is_some()),
            ("educationLevel", non_blank(&self.education_level).is_some()),
            ("department", non_blank(&self.department).is_some()),
            ("gender", non_blank(&self.gender).is_some()),
            ("nationality", non_blank(&self.nationality).is_some()),
            ("cv", non_blank(&self.cv).is_some()),
            ("status", non_blank(&self.status).is_some()),
            ("startDate", self.start_date.is_some()),
            ("endDate", self.end_date.is_some()),
            ("salary", self.salary_cents.is_some()),
        ])?;
        validate_non_negative("salary", self.salary_cents.unwrap_or(0))?;
        let email = email(&self.email);
        validate_email(email.as_deref().unwrap_or_default())?;

        Ok(Self {
            name: trimmed(&self.name),
            address: trimmed(&self.address),
            email,
            contact: trimmed(&self.contact),
            position: trimmed(&self.position),
            branch: trimmed(&self.branch),
            education_level: trimmed(&self.education_level),
            department: trimmed(&self.department),
            gender: trimmed(&self.gender),
            nationality: trimmed(&self.nationality),
            cv: trimmed(&self.cv),
            status: trimmed(&self.status),
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub position: Option<String>,
    pub branch: Option<String>,
    pub education_level: Option<String>,
    pub department: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub cv: Option<String>,
    pub status: Option<String>,

    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,

    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,

    pub salary_cents: Option<i64>,
}

impl EmployeeUpdate {
    pub fn normalized(self) -> ValidationResult<Option<Self>> {
        if let Some(salary) = self.salary_cents {
            validate_non_negative("salary", salary)?;
        }
        let update = Self {
            name: trimmed(&self.name),
            address: trimmed(&self.address),
            email: email(&self.email),
            contact: trimmed(&self.contact),
            position: trimmed(&self.position),
            branch: trimmed(&self.branch),
            education_level: trimmed(&self.education_level),
            department: trimmed(&self.department),
            gender: trimmed(&self.gender),
            nationality: trimmed(&self.nationality),
            cv: trimmed(&self.cv),
            status: trimmed(&self.status),
            ..self
        };
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        let empty = update.name.is_none()
            && update.address.is_none()
            && update.email.is_none()
            && update.contact.is_none()
            && update.position.is_none()
            && update.branch.is_none()
            && update.education_level.is_none()
            && update.department.is_none()
            && update.gender.is_none()
            && update.nationality.is_none()
            && update.cv.is_none()
            && update.status.is_none()
            && update.start_date.is_none()
            && update.end_date.is_none()
            && update.salary_cents.is_none();
        Ok((!empty).then_some(update))
    }
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub address: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSupplier {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

impl NewSupplier {
    pub fn validate(self) -> ValidationResult<Self> {
        require_fields(&[
            ("name", non_blank(&self.name).is_some()),
            ("email", non_blank(&self.email).is_some()),
            ("contact", non_blank(&self.contact).is_some()),
            ("address", non_blank(&self.address).is_some()),
        ])?;
        let email = email(&self.email);
        validate_email(email.as_deref().unwrap_or_default())?;

        Ok(Self {
            name: trimmed(&self.name),
            email,
            contact: trimmed(&self.contact),
            address: trimmed(&self.address),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

impl SupplierUpdate {
    pub fn normalized(self) -> ValidationResult<Option<Self>> {
        let update = Self {
            name: trimmed(&self.name),
            email: email(&self.email),
            contact: trimmed(&self.contact),
            address: trimmed(&self.address),
        };
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        let empty = update.name.is_none()
            && update.email.is_none()
            && update.contact.is_none()
            && update.address.is_none();
        Ok((!empty).then_some(update))
    }
}
