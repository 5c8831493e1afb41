//! In-memory store for demo mode and tests.
//!
//! Orders keep their creation sequence so listings come back oldest first,
//! like the persistent store. The conditional transitions take the write
//! lock once and check-and-mutate under it, which gives the same
//! only-if-unpaid guarantee the SQL store gets from a conditional `UPDATE`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowtoo_core::{OrderId, OrderStatus, ProductId, UserId};
use tokio::sync::RwLock;

use crate::models::{Order, Product, User};

use super::{OrderStore, PaymentConfirmation, ProductStore, StoreError, UserStore};

/// In-process store backing all three store traits.
#[derive(Default)]
pub struct MemoryStore {
    orders: RwLock<Vec<Order>>,
    products: RwLock<HashMap<ProductId, Product>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product (seeding).
    pub async fn put_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Insert or replace a user (seeding).
    pub async fn put_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| o.user == user)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders.read().await.clone())
    }

    async fn mark_payment_pending(
        &self,
        id: OrderId,
        method: &str,
    ) -> Result<Option<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id && !o.is_paid) else {
            return Ok(None);
        };
        order.status = OrderStatus::PaymentPending;
        order.payment_method = method.to_owned();
        Ok(Some(order.clone()))
    }

    async fn confirm_payment_if_unpaid(
        &self,
        id: OrderId,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id && !o.is_paid) else {
            return Ok(None);
        };
        order.is_paid = true;
        order.paid_at = Some(confirmation.paid_at);
        order.status = OrderStatus::Paid;
        order.payment_method = confirmation.payment_method;
        order.payment_result = Some(confirmation.result);
        Ok(Some(order.clone()))
    }

    async fn mark_delivered(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.is_delivered = true;
        order.delivered_at = Some(at);
        Ok(Some(order.clone()))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().await;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
