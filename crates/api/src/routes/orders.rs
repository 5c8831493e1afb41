//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use flowtoo_core::OrderId;

use crate::error::{ApiError, Result};
use crate::middleware::auth::{CurrentUser, RequireAdmin, RequireAuth};
use crate::models::{Order, OrderItem, ShippingAddress};
use crate::services::orders::OrderDraft;
use crate::state::AppState;

/// Order creation payload, camelCase wire format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

impl From<CreateOrderRequest> for OrderDraft {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            items: req.order_items,
            shipping_address: req.shipping_address,
            payment_method: req.payment_method,
            items_price: req.items_price,
            shipping_price: req.shipping_price,
            tax_price: req.tax_price,
            total_price: req.total_price,
        }
    }
}

/// `POST /orders`
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.ledger().create_order(user.id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders/mine`
pub async fn list_mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.ledger().list_mine(user.id).await?))
}

/// `GET /orders`
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.ledger().list_all().await?))
}

/// `POST /orders/:id/pay`
///
/// Direct payment-result injection: the client reports the processor's
/// result itself. Routed through the same conditional confirm as processor
/// callbacks, so a replay cannot overwrite an existing result.
pub async fn pay_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(payload): Json<Value>,
) -> Result<Json<Order>> {
    let order = state.ledger().get(id).await?;
    ensure_owner_or_admin(&order, &user)?;
    Ok(Json(state.ledger().pay_order(id, &payload).await?))
}

/// `PUT /orders/:id/deliver`
pub async fn deliver_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.ledger().mark_delivered(id).await?))
}

/// `DELETE /orders/:id`
pub async fn delete_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>> {
    state.ledger().delete_order(id).await?;
    Ok(Json(json!({ "message": "Order removed" })))
}

/// Only the order's owner or an admin may act on it.
pub(super) fn ensure_owner_or_admin(order: &Order, user: &CurrentUser) -> Result<()> {
    if order.user == user.id || user.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not your order".to_owned()))
    }
}
