//! # Validation Module
//!
//! Input rules shared by the API's write paths.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: JSON extraction (serde)                                      │
//! │  └── Types and enum values                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Required fields, ranges, formats                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK(quantity >= 0)                                   │
//! │  └── UNIQUE (username, sale_number, receipt_code, ...)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Fails with one combined message when any field is missing.
///
/// The message always names every field in the group, so clients see the
/// same hint regardless of which one they forgot.
///
/// ## Example
/// ```rust
/// use pharmacy_core::validation::require_fields;
///
/// let err = require_fields(&[("name", true), ("email", false)]).unwrap_err();
/// assert_eq!(err.to_string(), "name, email are required");
/// ```
pub fn require_fields(fields: &[(&str, bool)]) -> ValidationResult<()> {
    if fields.iter().all(|(_, present)| *present) {
        return Ok(());
    }
    Err(ValidationError::RequiredFields {
        fields: fields.iter().map(|(name, _)| name.to_string()).collect(),
    })
}

pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - At least 1
/// - At most 10 000 per line
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if !(1..=10_000).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 10_000,
        });
    }
    Ok(())
}

/// Normalises a username: trimmed and lowercased.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - No whitespace inside
pub fn normalize_username(username: &str) -> ValidationResult<String> {
    let username = username.trim().to_lowercase();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(username)
}

/// Minimal shape check: something before and after a single `@`, and a dot
/// in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_lists_the_whole_group() {
        assert!(require_fields(&[("a", true), ("b", true)]).is_ok());

        let err = require_fields(&[("category", false), ("notes", true)]).unwrap_err();
        assert_eq!(err.to_string(), "category, notes are required");
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(10_001).is_err());
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Admin ").unwrap(), "admin");
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username("two words").is_err());
        assert!(normalize_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("kofi@example.com").is_ok());
        assert!(validate_email("kofi@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("kofi.example.com").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("price", 0).is_ok());
        assert_eq!(
            validate_non_negative("price", -1).unwrap_err().to_string(),
            "price must be non-negative"
        );
    }
}
