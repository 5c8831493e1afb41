//! Persistence layer for orders, products, and users.
//!
//! The core logic never talks to a database directly; it goes through the
//! narrow traits below. Two implementations exist:
//!
//! - [`postgres::PgStore`] - JSONB documents in `PostgreSQL`, used when
//!   `DATABASE_URL` is configured. All cross-request consistency comes from
//!   single-statement conditional updates here.
//! - [`memory::MemoryStore`] - in-process maps behind a `tokio` lock, used
//!   for demo mode and tests.
//!
//! The two payment-state transitions are deliberately *conditional* store
//! operations rather than read-then-write pairs: a confirmation applies only
//! to a not-yet-paid order, so concurrent duplicate notifications can never
//! double-apply a payment result.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use flowtoo_core::{OrderId, ProductId, UserId};

use crate::models::{Order, PaymentResult, Product, User};

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document no longer deserializes into its model.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Everything `apply_payment_confirmation` writes in one shot.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// Processor label recorded as the order's payment method.
    pub payment_method: String,
    /// When the order was marked paid.
    pub paid_at: DateTime<Utc>,
    /// Normalized processor outcome retained on the order.
    pub result: PaymentResult,
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a freshly created order.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Fetch one order by ID.
    async fn find(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders owned by `user`, oldest first.
    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError>;

    /// All orders, oldest first (admin).
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Conditionally move an order to `payment_pending` with the given
    /// method label. Applies only while the order is unpaid; returns the
    /// updated order, or `None` when no unpaid order matched.
    async fn mark_payment_pending(
        &self,
        id: OrderId,
        method: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Atomically confirm payment iff the order exists and is not already
    /// paid. Returns the updated order when the transition happened, `None`
    /// when no unpaid order matched (absent or already paid - the caller
    /// disambiguates with [`find`](Self::find)).
    async fn confirm_payment_if_unpaid(
        &self,
        id: OrderId,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, StoreError>;

    /// Mark an order delivered. Returns the updated order, or `None` if
    /// absent.
    async fn mark_delivered(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError>;

    /// Remove an order unconditionally. Returns whether it existed.
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Catalog reads needed at order creation.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fetch one product by ID.
    async fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

/// User reads needed by payment initiation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch one user by ID.
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

/// Handles to the three stores, however they are backed.
#[derive(Clone)]
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub products: Arc<dyn ProductStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Bundle one backend that implements all three traits.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: OrderStore + ProductStore + UserStore + 'static,
    {
        Self {
            orders: backend.clone(),
            products: backend.clone(),
            users: backend,
        }
    }
}
