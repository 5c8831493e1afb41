//! The order ledger: canonical lifecycle state of every order.
//!
//! All payment-state transitions funnel through here. The ledger never
//! decides "paid" from its own reads - it hands the store a conditional
//! confirm that applies only to a not-yet-paid order, then interprets the
//! result. That keeps duplicate and concurrent processor notifications
//! idempotent without any in-process locking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use flowtoo_core::{OrderId, UserId};

use crate::error::{ApiError, Result};
use crate::models::{Order, OrderItem, PaymentResult, ShippingAddress};
use crate::payments::{PaymentEvent, PaymentOutcome};
use crate::store::{OrderStore, PaymentConfirmation};

use super::stock::StockGuard;

/// Validated input for order creation.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

/// Outcome of applying a payment notification to the ledger.
///
/// Every variant is an acknowledgement as far as the processor is
/// concerned; only store failures bubble up as errors.
#[derive(Debug)]
pub enum Reconciliation {
    /// The order transitioned to paid.
    Applied(Order),
    /// The order was already paid; nothing changed.
    AlreadyPaid(Order),
    /// The notification references no known order.
    UnknownOrder,
    /// The notification did not confirm payment; nothing changed.
    Ignored,
}

/// Owns order lifecycle state.
#[derive(Clone)]
pub struct OrderLedger {
    orders: Arc<dyn OrderStore>,
    stock: StockGuard,
}

impl OrderLedger {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>, stock: StockGuard) -> Self {
        Self { orders, stock }
    }

    /// Create an order in `created` state owned by `user`.
    ///
    /// # Errors
    ///
    /// `Validation` on empty items, `InsufficientStock` naming the first
    /// short line. Nothing is persisted on failure.
    pub async fn create_order(&self, user: UserId, draft: OrderDraft) -> Result<Order> {
        if draft.items.is_empty() {
            return Err(ApiError::Validation("No order items".to_owned()));
        }
        self.stock.ensure_available(&draft.items).await?;

        let order = Order::new(
            user,
            draft.items,
            draft.shipping_address,
            draft.payment_method,
            draft.items_price,
            draft.shipping_price,
            draft.tax_price,
            draft.total_price,
        );
        self.orders.insert(&order).await?;
        tracing::info!(order_id = %order.id, user_id = %user, "order created");
        Ok(order)
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order".to_owned()))
    }

    /// Orders owned by `user`.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn list_mine(&self, user: UserId) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_user(user).await?)
    }

    /// All orders (admin).
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(self.orders.list_all().await?)
    }

    /// Record that a payment was initiated with `method`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist, `AlreadyPaid` if it is paid.
    pub async fn mark_payment_initiated(&self, id: OrderId, method: &str) -> Result<Order> {
        if let Some(order) = self.orders.mark_payment_pending(id, method).await? {
            return Ok(order);
        }
        // No unpaid order matched: missing or already paid.
        match self.orders.find(id).await? {
            Some(_) => Err(ApiError::AlreadyPaid),
            None => Err(ApiError::NotFound("Order".to_owned())),
        }
    }

    /// Apply a normalized payment notification to the ledger.
    ///
    /// This is the single authorized path into the paid state. See
    /// [`Reconciliation`] for the possible outcomes; every one of them must
    /// be acknowledged to the processor.
    ///
    /// # Errors
    ///
    /// Store errors only - and those must surface as a retryable failure to
    /// the processor.
    pub async fn apply_payment_confirmation(
        &self,
        event: &PaymentEvent,
    ) -> Result<Reconciliation> {
        let Ok(order_id) = OrderId::parse(&event.order_ref) else {
            tracing::warn!(
                processor = event.processor,
                order_ref = %event.order_ref,
                "payment notification with unparseable order reference"
            );
            return Ok(Reconciliation::UnknownOrder);
        };

        if event.outcome != PaymentOutcome::Completed {
            tracing::debug!(
                processor = event.processor,
                order_id = %order_id,
                status = %event.raw_status,
                "non-confirming payment notification, no state change"
            );
            return Ok(Reconciliation::Ignored);
        }

        let now = Utc::now();
        let confirmation = PaymentConfirmation {
            payment_method: event.processor.to_owned(),
            paid_at: now,
            result: PaymentResult {
                id: event.transaction_id.clone(),
                status: event.raw_status.clone(),
                update_time: event.settled_at.unwrap_or(now),
                email_address: event.payer_email.clone(),
                raw: event.raw.clone(),
            },
        };

        if let Some(order) = self
            .orders
            .confirm_payment_if_unpaid(order_id, confirmation)
            .await?
        {
            tracing::info!(
                processor = event.processor,
                order_id = %order_id,
                transaction_id = ?event.transaction_id,
                "order marked paid"
            );
            return Ok(Reconciliation::Applied(order));
        }

        match self.orders.find(order_id).await? {
            Some(order) if order.is_paid => Ok(Reconciliation::AlreadyPaid(order)),
            Some(_) => Err(ApiError::Internal(
                "payment confirmation did not apply".to_owned(),
            )),
            None => {
                tracing::warn!(
                    processor = event.processor,
                    order_id = %order_id,
                    "payment notification for unknown order"
                );
                Ok(Reconciliation::UnknownOrder)
            }
        }
    }

    /// Direct payment-result injection (`POST /orders/:id/pay`).
    ///
    /// Accepts the caller-supplied payload, normalizes it, and routes it
    /// through the same conditional confirm as processor callbacks - a
    /// replayed call cannot clobber an existing `paymentResult`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist.
    pub async fn pay_order(&self, id: OrderId, payload: &Value) -> Result<Order> {
        let order = self.get(id).await?;
        if order.is_paid {
            return Ok(order);
        }

        let confirmation = PaymentConfirmation {
            payment_method: order.payment_method.clone(),
            paid_at: Utc::now(),
            result: normalize_direct_result(payload),
        };
        if let Some(updated) = self.orders.confirm_payment_if_unpaid(id, confirmation).await? {
            return Ok(updated);
        }
        // Lost a race with a processor confirmation; the order is paid now.
        self.get(id).await
    }

    /// Mark an order delivered (admin).
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order> {
        self.orders
            .mark_delivered(id, Utc::now())
            .await?
            .ok_or_else(|| ApiError::NotFound("Order".to_owned()))
    }

    /// Remove an order unconditionally (admin).
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist.
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        if self.orders.delete(id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound("Order".to_owned()))
        }
    }
}

/// Normalize a caller-supplied payment-result payload.
///
/// Clients send whatever their processor SDK gave them, either as the
/// request body itself or nested under `paymentResult`; probe the common
/// field spellings and keep the source payload as `raw`.
fn normalize_direct_result(payload: &Value) -> PaymentResult {
    let source = if payload["paymentResult"].is_object() {
        &payload["paymentResult"]
    } else {
        payload
    };
    let field = |name: &str| source[name].as_str().map(str::to_owned);

    let update_time = field("update_time")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    PaymentResult {
        id: field("id").or_else(|| field("transactionId")),
        status: field("status").unwrap_or_else(|| "COMPLETED".to_owned()),
        update_time,
        email_address: field("email_address")
            .or_else(|| source["payer"]["email_address"].as_str().map(str::to_owned)),
        raw: if source["raw"].is_null() {
            source.clone()
        } else {
            source["raw"].clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtoo_core::{OrderStatus, ProductId};
    use serde_json::json;

    use crate::models::Product;
    use crate::store::memory::MemoryStore;

    struct Fixture {
        ledger: OrderLedger,
        store: Arc<MemoryStore>,
        product: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let product = ProductId::new();
        store
            .put_product(Product {
                id: product,
                name: "Karoo throw".to_owned(),
                image: "/images/throw.jpg".to_owned(),
                price: "99.99".parse().expect("decimal"),
                count_in_stock: 5,
            })
            .await;
        let ledger = OrderLedger::new(store.clone(), StockGuard::new(store.clone()));
        Fixture {
            ledger,
            store,
            product,
        }
    }

    fn draft(product: ProductId, qty: u32) -> OrderDraft {
        OrderDraft {
            items: vec![OrderItem {
                product,
                name: "Karoo throw".to_owned(),
                image: "/images/throw.jpg".to_owned(),
                qty,
                price: "99.99".parse().expect("decimal"),
            }],
            shipping_address: ShippingAddress {
                address: "3 Main Rd".to_owned(),
                city: "Durban".to_owned(),
                postal_code: "4001".to_owned(),
                country: "ZA".to_owned(),
            },
            payment_method: "PayFast".to_owned(),
            items_price: "199.98".parse().expect("decimal"),
            shipping_price: "0".parse().expect("decimal"),
            tax_price: "0".parse().expect("decimal"),
            total_price: "199.98".parse().expect("decimal"),
        }
    }

    fn completed_event(order_ref: String) -> PaymentEvent {
        PaymentEvent {
            order_ref,
            outcome: PaymentOutcome::Completed,
            transaction_id: Some("pf-1089250".to_owned()),
            processor: "PayFast",
            raw_status: "COMPLETE".to_owned(),
            payer_email: Some("thandi@example.com".to_owned()),
            settled_at: None,
            raw: json!({"payment_status": "COMPLETE"}),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_items() {
        let fx = fixture().await;
        let mut empty = draft(fx.product, 1);
        empty.items.clear();
        let err = fx
            .ledger
            .create_order(UserId::new(), empty)
            .await
            .expect_err("empty items");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_insufficient_stock_persists_nothing() {
        let fx = fixture().await;
        let err = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 6))
            .await
            .expect_err("too many");
        assert!(matches!(err, ApiError::InsufficientStock(_)));
        assert!(fx.store.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_payment_initiation_lifecycle() {
        let fx = fixture().await;
        let user = UserId::new();
        let order = fx
            .ledger
            .create_order(user, draft(fx.product, 2))
            .await
            .expect("create");
        assert_eq!(order.status, OrderStatus::Created);

        let pending = fx
            .ledger
            .mark_payment_initiated(order.id, "Stripe")
            .await
            .expect("initiate");
        assert_eq!(pending.status, OrderStatus::PaymentPending);
        assert_eq!(pending.payment_method, "Stripe");

        let err = fx
            .ledger
            .mark_payment_initiated(OrderId::new(), "Stripe")
            .await
            .expect_err("missing order");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_confirmation_sets_paid_invariants() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");

        let outcome = fx
            .ledger
            .apply_payment_confirmation(&completed_event(order.id.to_string()))
            .await
            .expect("apply");
        let Reconciliation::Applied(paid) = outcome else {
            panic!("expected Applied, got {outcome:?}");
        };

        assert!(paid.is_paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_method, "PayFast");
        let result = paid.payment_result.expect("payment result");
        assert_eq!(result.id.as_deref(), Some("pf-1089250"));
        assert_eq!(result.status, "COMPLETE");
        assert_eq!(result.email_address.as_deref(), Some("thandi@example.com"));
    }

    #[tokio::test]
    async fn test_duplicate_confirmation_is_idempotent() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");
        let event = completed_event(order.id.to_string());

        let first = fx
            .ledger
            .apply_payment_confirmation(&event)
            .await
            .expect("first");
        let Reconciliation::Applied(paid) = first else {
            panic!("expected Applied");
        };

        let mut replay = event.clone();
        replay.transaction_id = Some("pf-9999999".to_owned());
        let second = fx
            .ledger
            .apply_payment_confirmation(&replay)
            .await
            .expect("second");
        let Reconciliation::AlreadyPaid(unchanged) = second else {
            panic!("expected AlreadyPaid");
        };

        // First confirmation wins; the replay changed nothing
        assert_eq!(unchanged.paid_at, paid.paid_at);
        assert_eq!(
            unchanged.payment_result.expect("result").id.as_deref(),
            Some("pf-1089250")
        );
    }

    #[tokio::test]
    async fn test_unknown_order_is_a_benign_no_op() {
        let fx = fixture().await;
        let outcome = fx
            .ledger
            .apply_payment_confirmation(&completed_event(OrderId::new().to_string()))
            .await
            .expect("apply");
        assert!(matches!(outcome, Reconciliation::UnknownOrder));
    }

    #[tokio::test]
    async fn test_unparseable_order_ref_is_a_benign_no_op() {
        let fx = fixture().await;
        let outcome = fx
            .ledger
            .apply_payment_confirmation(&completed_event("definitely-not-a-uuid".to_owned()))
            .await
            .expect("apply");
        assert!(matches!(outcome, Reconciliation::UnknownOrder));
    }

    #[tokio::test]
    async fn test_non_completed_outcome_never_sets_paid() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");

        let mut event = completed_event(order.id.to_string());
        event.outcome = PaymentOutcome::Other;
        event.raw_status = "CANCELLED".to_owned();

        let outcome = fx
            .ledger
            .apply_payment_confirmation(&event)
            .await
            .expect("apply");
        assert!(matches!(outcome, Reconciliation::Ignored));

        let stored = fx.ledger.get(order.id).await.expect("get");
        assert!(!stored.is_paid);
        assert!(stored.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_direct_pay_normalizes_loose_payloads() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");

        let payload = json!({
            "transactionId": "tx-42",
            "payer": {"email_address": "buyer@example.com"},
        });
        let paid = fx
            .ledger
            .pay_order(order.id, &payload)
            .await
            .expect("pay");
        assert!(paid.is_paid);
        let result = paid.payment_result.expect("result");
        assert_eq!(result.id.as_deref(), Some("tx-42"));
        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.email_address.as_deref(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn test_direct_pay_unwraps_nested_payment_result() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");

        let payload = json!({
            "paymentResult": {
                "id": "tx-nested",
                "status": "COMPLETED",
                "email_address": "buyer@example.com",
            }
        });
        let paid = fx
            .ledger
            .pay_order(order.id, &payload)
            .await
            .expect("pay");
        assert!(paid.is_paid);
        let result = paid.payment_result.expect("result");
        assert_eq!(result.id.as_deref(), Some("tx-nested"));
        assert_eq!(result.email_address.as_deref(), Some("buyer@example.com"));
        assert_eq!(result.raw["id"].as_str(), Some("tx-nested"));
    }

    #[tokio::test]
    async fn test_direct_pay_replay_keeps_first_result() {
        let fx = fixture().await;
        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 2))
            .await
            .expect("create");

        let first = fx
            .ledger
            .pay_order(order.id, &json!({"id": "tx-1"}))
            .await
            .expect("pay");
        let replay = fx
            .ledger
            .pay_order(order.id, &json!({"id": "tx-2"}))
            .await
            .expect("replay");

        assert_eq!(replay.paid_at, first.paid_at);
        assert_eq!(
            replay.payment_result.expect("result").id.as_deref(),
            Some("tx-1")
        );
    }

    #[tokio::test]
    async fn test_admin_operations_require_existing_order() {
        let fx = fixture().await;
        assert!(matches!(
            fx.ledger.mark_delivered(OrderId::new()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            fx.ledger.delete_order(OrderId::new()).await,
            Err(ApiError::NotFound(_))
        ));

        let order = fx
            .ledger
            .create_order(UserId::new(), draft(fx.product, 1))
            .await
            .expect("create");
        let delivered = fx.ledger.mark_delivered(order.id).await.expect("deliver");
        assert!(delivered.is_delivered);
        assert!(delivered.delivered_at.is_some());

        fx.ledger.delete_order(order.id).await.expect("delete");
        assert!(matches!(
            fx.ledger.get(order.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
