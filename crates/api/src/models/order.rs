//! Order document model.
//!
//! An order snapshots everything it needs at creation time (line items,
//! prices, shipping address) so later catalog edits never change what the
//! customer agreed to pay. Payment state lives on the order itself; the
//! normalized outcome of the confirming processor notification is kept in
//! [`PaymentResult`] for audit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flowtoo_core::{OrderId, OrderStatus, ProductId, UserId};

/// A single order line, snapshotted at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog product this line refers to.
    pub product: ProductId,
    /// Display name at order time.
    pub name: String,
    /// Image URL at order time.
    pub image: String,
    /// Requested quantity.
    pub qty: u32,
    /// Unit price at order time, major units.
    pub price: Decimal,
}

/// Shipping address snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Normalized record of the payment event that confirmed an order.
///
/// `raw` retains the processor's payload verbatim for audit; everything else
/// is the normalized projection the rest of the system relies on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// External transaction ID assigned by the processor.
    pub id: Option<String>,
    /// Processor's own status string (e.g. `COMPLETE`, `paid`).
    pub status: String,
    /// Settlement time reported by the processor, or receipt time.
    pub update_time: DateTime<Utc>,
    /// Payer email as reported by the processor.
    pub email_address: Option<String>,
    /// Raw processor payload.
    pub raw: serde_json::Value,
}

/// The central order entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Owning user.
    pub user: UserId,
    /// Line items, immutable after creation.
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    /// Free-form label for the processor used ("PayFast", "Stripe", ...).
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order in `created` state owned by `user`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user: UserId,
        order_items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: String,
        items_price: Decimal,
        shipping_price: Decimal,
        tax_price: Decimal,
        total_price: Decimal,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user,
            order_items,
            shipping_address,
            payment_method,
            items_price,
            shipping_price,
            tax_price,
            total_price,
            status: OrderStatus::Created,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            payment_result: None,
            created_at: Utc::now(),
        }
    }
}
