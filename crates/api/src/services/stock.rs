//! Advisory stock validation at order creation.
//!
//! For every requested line, the recorded stock count must cover the
//! requested quantity or the whole creation fails - no partial orders.
//!
//! The check is advisory: it is not atomic with any decrement (nothing here
//! decrements stock at all), so two concurrent orders against the same
//! low-stock product can both pass. Closing that race means a guarded
//! decrement in the store or a real inventory reservation subsystem; until
//! one exists, recorded stock can oversell under concurrency.

use std::sync::Arc;

use crate::error::{ApiError, Result};
use crate::models::OrderItem;
use crate::store::ProductStore;

/// Availability of one requested line at validation time.
#[derive(Debug, Clone)]
pub struct StockCheckResult {
    /// Display name of the line item.
    pub name: String,
    /// Requested quantity.
    pub requested: u32,
    /// Recorded stock when checked; `None` if the product no longer exists.
    pub in_stock: Option<i64>,
}

impl StockCheckResult {
    /// Whether the recorded stock covers the request.
    #[must_use]
    pub fn available(&self) -> bool {
        self.in_stock
            .is_some_and(|count| count >= i64::from(self.requested))
    }
}

/// Validates product availability at order-creation time.
#[derive(Clone)]
pub struct StockGuard {
    products: Arc<dyn ProductStore>,
}

impl StockGuard {
    #[must_use]
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Check every line against recorded stock.
    ///
    /// # Errors
    ///
    /// Returns a store error if a product lookup fails.
    pub async fn check(&self, items: &[OrderItem]) -> Result<Vec<StockCheckResult>> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let product = self.products.find(item.product).await?;
            results.push(StockCheckResult {
                name: item.name.clone(),
                requested: item.qty,
                // a product that cannot be found cannot be promised
                in_stock: product.map(|p| p.count_in_stock),
            });
        }
        Ok(results)
    }

    /// Fail order creation if any line is short, naming the first one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InsufficientStock`] for the first failing line.
    pub async fn ensure_available(&self, items: &[OrderItem]) -> Result<()> {
        for result in self.check(items).await? {
            if !result.available() {
                return Err(ApiError::InsufficientStock(result.name));
            }
        }
        Ok(())
    }
}
