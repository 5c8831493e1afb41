//! Payment processor adapters.
//!
//! Each adapter translates one processor's initiation call and asynchronous
//! notification format into a normalized [`PaymentEvent`]. The processors
//! have nothing in common on the wire - PayFast redirects the shopper and
//! later POSTs a form-encoded IPN; Stripe hosts a checkout session and
//! later POSTs a signed JSON webhook - so normalization happens here and
//! nowhere else. The reconciliation logic in
//! [`crate::services::orders::OrderLedger`] only ever sees `PaymentEvent`s.

pub mod payfast;
pub mod stripe;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use payfast::PayfastGateway;
pub use stripe::{CheckoutSession, SignatureError, StripeGateway};

/// Confirmation status of a normalized payment notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The processor confirmed payment.
    Completed,
    /// The processor reported a definitive failure.
    Failed,
    /// Anything else (pending, cancelled, unrecognized). Acknowledged but
    /// never applied.
    Other,
}

/// Normalized outcome of a processor notification.
///
/// `order_ref` is kept as the raw string the processor sent: notifications
/// are untrusted input, and a garbage reference must behave like an unknown
/// order (benign acknowledgement), not like a parse failure.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// The order this notification claims to be about.
    pub order_ref: String,
    /// Normalized confirmation status.
    pub outcome: PaymentOutcome,
    /// External transaction ID assigned by the processor.
    pub transaction_id: Option<String>,
    /// Which adapter produced this event.
    pub processor: &'static str,
    /// The processor's own status string, verbatim.
    pub raw_status: String,
    /// Payer email, if the processor reports one.
    pub payer_email: Option<String>,
    /// Settlement time, if the processor reports one.
    pub settled_at: Option<DateTime<Utc>>,
    /// Full processor payload, retained on the order for audit.
    pub raw: serde_json::Value,
}

/// Errors talking to a processor during payment initiation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP call to the processor failed.
    #[error("processor request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor answered with something we cannot use.
    #[error("processor returned malformed response: {0}")]
    MalformedResponse(String),

    /// An order amount does not convert to minor units.
    #[error("order amount out of range for minor-unit conversion")]
    AmountOutOfRange,
}
