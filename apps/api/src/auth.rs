//! # Authentication
//!
//! Hybrid bearer-token / server-side-session authentication.
//!
//! ```text
//! Authorization: Bearer <jwt>            Cookie: pharmacy.sid=<session id>
//!        │                                          │
//!        ▼                                          │
//!  verify HS256 ──bad──────────────────────────────►│
//!        │ ok                                       ▼
//!        ▼                                  sessions.find_valid(id)
//!  sessions.find_valid(claims.sid)                  │
//!        │ active, unexpired, same user             │
//!        ▼                                          ▼
//!              CurrentUser { user_id, role, session_id }
//! ```
//!
//! A token is only as good as its session: logging in again, logging out,
//! changing the user's role or status, or deleting the user invalidates the
//! session and with it every token that names it. Inactive accounts are
//! refused even while a session is still alive.
//!
//! Route gates are extractors. A handler taking [`AdminUser`] only runs for
//! admins; everyone else gets 403 with the required and current roles.

use std::marker::PhantomData;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use cookie::{time, Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use pharmacy_core::{Role, Session, UserStatus};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "pharmacy.sid";

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,

    pub role: Role,

    /// Session id the token was issued for
    pub sid: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Signs and verifies HS256 bearer tokens.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Issues a token for a user's session.
    pub fn issue(&self, user_id: &str, role: Role, session_id: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.lifetime_secs)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::SessionInvalid
            })
    }
}

/// Extract bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password into an Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against its stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Session Cookie
// =============================================================================

/// Value of the session cookie, if the request carries one.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value opening a session.
pub fn set_session_cookie(session_id: &str, max_age_secs: i64, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
        .to_string()
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    set_session_cookie("", 0, secure)
}

// =============================================================================
// Current User
// =============================================================================

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub role: Role,
    pub session_id: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves the caller from the bearer token, falling back to the session
/// cookie.
pub async fn authenticate(headers: &HeaderMap, state: &AppState) -> ApiResult<CurrentUser> {
    let now = Utc::now();
    let sessions = state.db.sessions();
    let mut presented = false;

    if let Some(token) = bearer_token(headers) {
        presented = true;
        if let Ok(claims) = state.jwt.verify(token) {
            match sessions.find_valid(&claims.sid, now).await? {
                Some(session) if session.user_id == claims.sub => {
                    if let Some(user) = admit(state, session).await? {
                        return Ok(user);
                    }
                }
                _ => debug!(sid = %claims.sid, "Token session is no longer valid"),
            }
        }
    }

    if let Some(session_id) = session_cookie(headers) {
        presented = true;
        if let Some(session) = sessions.find_valid(&session_id, now).await? {
            if let Some(user) = admit(state, session).await? {
                return Ok(user);
            }
        }
    }

    Err(if presented {
        ApiError::SessionInvalid
    } else {
        ApiError::Unauthenticated
    })
}

/// Sessions of deleted or inactive accounts do not authenticate. The role
/// comes from the account, not from the session row.
async fn admit(state: &AppState, session: Session) -> ApiResult<Option<CurrentUser>> {
    match state.db.users().get(&session.user_id).await? {
        Some(user) if user.status == UserStatus::Active => Ok(Some(CurrentUser {
            user_id: user.id,
            role: user.role,
            session_id: session.id,
        })),
        _ => {
            debug!(user_id = %session.user_id, "Session belongs to an inactive account");
            Ok(None)
        }
    }
}

/// The session a logout should end: the cookie's, else the token's `sid`.
/// Expired tokens still name their session.
pub fn presented_session_id(headers: &HeaderMap, state: &AppState) -> Option<String> {
    if let Some(id) = session_cookie(headers) {
        return Some(id);
    }
    let token = bearer_token(headers)?;
    state.jwt.verify(token).ok().map(|claims| claims.sid)
}

// =============================================================================
// Extractors
// =============================================================================

/// Any authenticated user, whatever the role.
pub struct Authenticated(pub CurrentUser);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state).await.map(Authenticated)
    }
}

/// The set of roles a route admits.
pub trait RoleGate: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

pub mod gate {
    use super::RoleGate;
    use pharmacy_core::Role;

    pub struct Admin;
    pub struct Sales;
    pub struct Store;
    pub struct Staff;

    impl RoleGate for Admin {
        const ROLES: &'static [Role] = &[Role::Admin];
    }

    impl RoleGate for Sales {
        const ROLES: &'static [Role] = &[Role::Admin, Role::Salesperson];
    }

    impl RoleGate for Store {
        const ROLES: &'static [Role] = &[Role::Admin, Role::Storekeeper];
    }

    impl RoleGate for Staff {
        const ROLES: &'static [Role] = &[Role::Admin, Role::Salesperson, Role::Storekeeper];
    }
}

/// An authenticated user whose role passed the gate `G`.
pub struct Authorized<G: RoleGate> {
    pub user: CurrentUser,
    gate: PhantomData<fn() -> G>,
}

impl<G: RoleGate> Authorized<G> {
    fn check(user: CurrentUser) -> ApiResult<Self> {
        if !G::ROLES.contains(&user.role) {
            return Err(ApiError::Forbidden {
                required: G::ROLES.to_vec(),
                current: user.role,
            });
        }
        Ok(Authorized {
            user,
            gate: PhantomData,
        })
    }
}

impl<G: RoleGate> FromRequestParts<AppState> for Authorized<G> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(&parts.headers, state).await?;
        Self::check(user)
    }
}

pub type AdminUser = Authorized<gate::Admin>;
pub type SalesUser = Authorized<gate::Sales>;
pub type StoreUser = Authorized<gate::Store>;
pub type StaffUser = Authorized<gate::Staff>;
