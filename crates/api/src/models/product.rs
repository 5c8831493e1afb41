//! Catalog product, as far as order creation cares about it.
//!
//! Catalog management is a separate concern; this service only reads
//! products to snapshot prices and check recorded stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flowtoo_core::ProductId;

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    /// Unit price, major units.
    pub price: Decimal,
    /// Recorded stock count. Advisory only; nothing here decrements it.
    pub count_in_stock: i64,
}
