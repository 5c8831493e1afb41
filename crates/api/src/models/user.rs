//! User account, as far as orders and payments care about it.
//!
//! Registration, login, and token issuance live elsewhere; this service
//! only needs the owning user's identity and email (payment processors want
//! a payer email).

use serde::{Deserialize, Serialize};

use flowtoo_core::{Email, UserId};

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
}
