//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::payments::{PayfastGateway, StripeGateway};
use crate::services::{OrderLedger, StockGuard};
use crate::store::{Stores, UserStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the order ledger, gateways, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    ledger: OrderLedger,
    payfast: PayfastGateway,
    stripe: StripeGateway,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        let stock = StockGuard::new(stores.products.clone());
        let ledger = OrderLedger::new(stores.orders.clone(), stock);
        let payfast = PayfastGateway::new(config.payfast.clone());
        let stripe = StripeGateway::new(config.stripe.clone(), config.client_url.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                ledger,
                payfast,
                stripe,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }

    /// Get a reference to the user store.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.inner.stores.users
    }

    /// Get a reference to the PayFast gateway.
    #[must_use]
    pub fn payfast(&self) -> &PayfastGateway {
        &self.inner.payfast
    }

    /// Get a reference to the Stripe gateway.
    #[must_use]
    pub fn stripe(&self) -> &StripeGateway {
        &self.inner.stripe
    }

    /// Probe the backing store, for the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns the store error if the probe fails.
    pub async fn ping_store(&self) -> Result<(), crate::store::StoreError> {
        self.inner.stores.orders.ping().await
    }
}
