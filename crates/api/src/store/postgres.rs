//! `PostgreSQL`-backed document store.
//!
//! Each entity lives in a JSONB `doc` column alongside a few extracted
//! columns (`user_id`, `is_paid`, `created_at`) used for filtering and for
//! the conditional payment transitions. The `UPDATE ... WHERE is_paid =
//! FALSE` guard is what makes `confirm_payment_if_unpaid` race-free: two
//! concurrent confirmations for the same order contend on the row lock and
//! only the first one matches.
//!
//! Migrations are in `crates/api/migrations/` and run on startup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use flowtoo_core::{OrderId, ProductId, UserId};

use crate::models::{Order, Product, User};

use super::{OrderStore, PaymentConfirmation, ProductStore, StoreError, UserStore};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// JSONB document store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn decode<T: serde::de::DeserializeOwned>(doc: serde_json::Value) -> Result<T, StoreError> {
        serde_json::from_value(doc)
            .map_err(|e| StoreError::DataCorruption(format!("stored document: {e}")))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(value)
            .map_err(|e| StoreError::DataCorruption(format!("document encoding: {e}")))
    }

    async fn fetch_doc(
        &self,
        query: &'static str,
        id: uuid::Uuid,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<serde_json::Value, _>("doc")))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let doc = Self::encode(order)?;
        sqlx::query(
            "INSERT INTO orders (id, user_id, is_paid, created_at, doc)
             VALUES ($1, $2, FALSE, $3, $4)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user.as_uuid())
        .bind(order.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_doc("SELECT doc FROM orders WHERE id = $1", id.as_uuid())
            .await?
            .map(Self::decode)
            .transpose()
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM orders WHERE user_id = $1 ORDER BY created_at")
            .bind(user.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| Self::decode(r.get::<serde_json::Value, _>("doc")))
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM orders ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| Self::decode(r.get::<serde_json::Value, _>("doc")))
            .collect()
    }

    async fn mark_payment_pending(
        &self,
        id: OrderId,
        method: &str,
    ) -> Result<Option<Order>, StoreError> {
        let patch = json!({
            "status": "payment_pending",
            "paymentMethod": method,
        });
        let row = sqlx::query(
            "UPDATE orders SET doc = doc || $2
             WHERE id = $1 AND is_paid = FALSE
             RETURNING doc",
        )
        .bind(id.as_uuid())
        .bind(patch)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::decode(r.get::<serde_json::Value, _>("doc")))
            .transpose()
    }

    async fn confirm_payment_if_unpaid(
        &self,
        id: OrderId,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, StoreError> {
        let patch = json!({
            "isPaid": true,
            "paidAt": confirmation.paid_at,
            "status": "paid",
            "paymentMethod": confirmation.payment_method,
            "paymentResult": Self::encode(&confirmation.result)?,
        });
        let row = sqlx::query(
            "UPDATE orders SET is_paid = TRUE, doc = doc || $2
             WHERE id = $1 AND is_paid = FALSE
             RETURNING doc",
        )
        .bind(id.as_uuid())
        .bind(patch)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::decode(r.get::<serde_json::Value, _>("doc")))
            .transpose()
    }

    async fn mark_delivered(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        let patch = json!({
            "isDelivered": true,
            "deliveredAt": at,
        });
        let row = sqlx::query(
            "UPDATE orders SET doc = doc || $2
             WHERE id = $1
             RETURNING doc",
        )
        .bind(id.as_uuid())
        .bind(patch)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::decode(r.get::<serde_json::Value, _>("doc")))
            .transpose()
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_doc("SELECT doc FROM products WHERE id = $1", id.as_uuid())
            .await?
            .map(Self::decode)
            .transpose()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_doc("SELECT doc FROM users WHERE id = $1", id.as_uuid())
            .await?
            .map(Self::decode)
            .transpose()
    }
}
