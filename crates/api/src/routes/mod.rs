//! HTTP route handlers for the order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (probes the store)
//!
//! # Orders (Bearer auth)
//! POST   /orders                       - Create order
//! GET    /orders/mine                  - Caller's orders
//! GET    /orders                       - All orders (admin)
//! POST   /orders/:id/pay               - Direct payment-result injection
//! GET    /orders/:id/payfast-init      - Signed PayFast redirect URL
//! POST   /orders/:id/checkout-session  - Hosted Stripe checkout session
//! PUT    /orders/:id/deliver           - Mark delivered (admin)
//! DELETE /orders/:id                   - Remove order (admin)
//!
//! # Processor callbacks (public, raw bodies)
//! POST /orders/payment/ipn             - PayFast ITN/IPN
//! POST /orders/payment/webhook         - Stripe signed webhook
//! ```

pub mod orders;
pub mod payments;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::json;

use crate::state::AppState;

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let order_routes = Router::new()
        .route("/", post(orders::create_order).get(orders::list_all))
        .route("/mine", get(orders::list_mine))
        .route("/{id}/pay", post(orders::pay_order))
        .route("/{id}/payfast-init", get(payments::payfast_init))
        .route("/{id}/checkout-session", post(payments::checkout_session))
        .route("/{id}/deliver", put(orders::deliver_order))
        .route("/{id}", axum::routing::delete(orders::delete_order))
        .route("/payment/ipn", post(payments::payfast_ipn))
        .route("/payment/webhook", post(payments::stripe_webhook));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/orders", order_routes)
        .with_state(state)
}

/// Liveness check.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness check; probes the backing store.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.ping_store().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(err) => {
            tracing::error!(error = %err, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
