//! Core types for Flowtoo.
//!
//! Type-safe wrappers for the domain concepts shared across the workspace.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_amount, to_minor_units};
pub use status::OrderStatus;
