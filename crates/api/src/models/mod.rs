//! Domain models persisted in the document store.
//!
//! Wire format is camelCase JSON throughout, matching what the storefront
//! client already speaks.

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderItem, PaymentResult, ShippingAddress};
pub use product::Product;
pub use user::User;
