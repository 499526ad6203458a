//! Logic shared by several routes or by routes and background jobs.
//!
//! - [`accounts`] - Signup, login and session issuing
//! - [`alerts`] - Low-stock / expiry notification checks

pub mod accounts;
pub mod alerts;
