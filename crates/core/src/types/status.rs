//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Payment lifecycle state of an order.
///
/// Orders move `created` → `payment_pending` → `paid`. A failed or ignored
/// processor notification leaves the order in `payment_pending`; delivery is
/// tracked by an orthogonal flag on the order itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly created, no payment attempt yet.
    #[default]
    Created,
    /// A payment was initiated with a processor; awaiting confirmation.
    PaymentPending,
    /// A processor confirmed payment. Terminal for the payment flow.
    Paid,
}

impl OrderStatus {
    /// Wire-format name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PaymentPending => "payment_pending",
            Self::Paid => "paid",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
