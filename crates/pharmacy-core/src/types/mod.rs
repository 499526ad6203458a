//! # Domain Types
//!
//! Records persisted by `pharmacy-db` and serialised by the API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  user        User, Role, UserStatus, Session                            │
//! │  product     Product, PublishStatus, Stock                              │
//! │  sale        Sale, SaleItem, PaymentMethod, SalePaymentStatus           │
//! │  order       Order, OrderItem, OrderStatus, OrderPaymentStatus          │
//! │  notification Notification, NotificationKind                            │
//! │  directory   Customer, Employee, Supplier                               │
//! │  finance     Salary, Expense                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, immutable.
//! - Money fields end in `_cents` and hold integer minor units.
//! - JSON uses camelCase; database columns use snake_case.
//! - `NewX` is a create payload, `XUpdate` a partial update where every
//!   field is optional and absent fields are left untouched.

mod directory;
mod finance;
mod notification;
mod order;
mod product;
mod sale;
mod user;

pub use directory::*;
pub use finance::*;
pub use notification::*;
pub use order::*;
pub use product::*;
pub use sale::*;
pub use user::*;

/// Trims a string and maps empty results to `None`.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
