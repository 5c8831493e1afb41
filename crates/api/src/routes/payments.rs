//! Payment route handlers: initiation and processor callbacks.
//!
//! The two callback endpoints are public and speak each processor's
//! acknowledgement dialect. PayFast retries an IPN that does not get a
//! plain 200, so every reconciliation outcome short of a store failure is
//! acknowledged. Stripe retries on any non-2xx, so signature failures are
//! rejected with 400 and everything else is received.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use flowtoo_core::{OrderId, UserId};

use crate::error::{ApiError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::User;
use crate::payments::{SignatureError, payfast, stripe};
use crate::services::Reconciliation;
use crate::state::AppState;

use super::orders::ensure_owner_or_admin;

/// `GET /orders/:id/payfast-init`
///
/// Marks the order `payment_pending` and answers with the signed redirect
/// URL the shopper must be sent to.
pub async fn payfast_init(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>> {
    let order = state.ledger().get(id).await?;
    ensure_owner_or_admin(&order, &user)?;

    let owner = find_owner(&state, order.user).await?;
    let order = state
        .ledger()
        .mark_payment_initiated(id, payfast::PROCESSOR)
        .await?;

    let url = state.payfast().redirect_url(&order, &owner);
    Ok(Json(json!({ "redirectUrl": url })))
}

/// `POST /orders/:id/checkout-session`
///
/// Marks the order `payment_pending` and answers with the hosted Stripe
/// checkout URL.
pub async fn checkout_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>> {
    let order = state.ledger().get(id).await?;
    ensure_owner_or_admin(&order, &user)?;

    let owner = find_owner(&state, order.user).await?;
    let order = state
        .ledger()
        .mark_payment_initiated(id, stripe::PROCESSOR)
        .await?;

    let session = state.stripe().create_checkout_session(&order, &owner).await?;
    Ok(Json(json!({ "checkoutUrl": session.url })))
}

/// `POST /orders/payment/ipn`
///
/// PayFast posts a form-encoded notification body. The acknowledgement
/// contract is PayFast's: 200 with a short text body for anything we could
/// process (including unknown orders), 500 only when the store failed and
/// the notification should be retried.
pub async fn payfast_ipn(State(state): State<AppState>, body: String) -> Response {
    let event = state.payfast().parse_ipn(&body);
    match state.ledger().apply_payment_confirmation(&event).await {
        Ok(Reconciliation::UnknownOrder) => (StatusCode::OK, "INVALID ORDER").into_response(),
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => {
            let event_id = sentry::capture_error(&err);
            tracing::error!(
                error = %err,
                sentry_event_id = %event_id,
                "IPN reconciliation failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR").into_response()
        }
    }
}

/// `POST /orders/payment/webhook`
///
/// Stripe posts a signed JSON event. A missing or invalid signature is
/// rejected with 400 before anything is read from the payload; every
/// verified event is acknowledged with `{"received": true}` whether or not
/// it changed an order.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MalformedHeader)?;

    if let Some(event) = state.stripe().parse_webhook(&body, signature)? {
        state.ledger().apply_payment_confirmation(&event).await?;
    }
    Ok(Json(json!({ "received": true })))
}

/// Load the order owner's user record, for processor-facing fields.
async fn find_owner(state: &AppState, id: UserId) -> Result<User> {
    state
        .users()
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_owned()))
}
