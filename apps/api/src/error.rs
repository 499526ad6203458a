//! # API Errors
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{ "error": "<message>" }` with the status below.
//!
//! ```text
//! ┌──────────────────────────────────────────────┬────────┐
//! │ BadRequest, Validation, Core, rule failures  │  400   │
//! │ Unauthenticated, SessionInvalid, BadLogin    │  401   │
//! │ Forbidden (+ required / current), Denied     │  403   │
//! │ NotFound                                     │  404   │
//! │ Conflict, UNIQUE violations                  │  409   │
//! │ everything else                              │  500   │
//! └──────────────────────────────────────────────┴────────┘
//! ```
//!
//! 500s are logged and the client only ever sees "Internal server error".

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use pharmacy_core::{CoreError, Role, ValidationError};
use pharmacy_db::DbError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// No credentials at all.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Credentials were presented but their session is gone.
    #[error("Session expired or invalid")]
    SessionInvalid,

    /// Failed login.
    #[error("{0}")]
    BadLogin(String),

    /// Authenticated, but the role is not in the route's gate.
    #[error("Insufficient permissions")]
    Forbidden { required: Vec<Role>, current: Role },

    /// Refused for a reason other than the role gate.
    #[error("{0}")]
    Denied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Core(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated | ApiError::SessionInvalid | ApiError::BadLogin(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden { .. } | ApiError::Denied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(db) => match db {
                DbError::NotFound { .. } => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::StockConflict { .. }
                | DbError::AlreadyRefunded
                | DbError::Rule(_)
                | DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message the client sees.
    fn client_message(&self) -> String {
        match self {
            ApiError::Database(db) => match db {
                DbError::NotFound { .. }
                | DbError::StockConflict { .. }
                | DbError::AlreadyRefunded
                | DbError::Rule(_)
                | DbError::CodeSpaceExhausted => db.to_string(),
                DbError::UniqueViolation { field, .. } => {
                    format!("{} already exists", column_name(field))
                }
                DbError::ForeignKeyViolation { .. } => "Referenced record not found".to_string(),
                _ => "Internal server error".to_string(),
            },
            ApiError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// `"products.product_code"` → `"product_code"`.
fn column_name(field: &str) -> &str {
    let first = field.split(',').next().unwrap_or(field).trim();
    first.rsplit('.').next().unwrap_or(first)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = match &self {
            ApiError::Forbidden { required, current } => json!({
                "error": self.client_message(),
                "required": required,
                "current": current,
            }),
            _ => json!({ "error": self.client_message() }),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Extractor Rejections
// =============================================================================
// Malformed bodies, query strings and paths keep the `{error}` envelope.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
