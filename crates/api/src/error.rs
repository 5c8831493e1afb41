//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` covering the whole failure taxonomy. Route
//! handlers return `Result<T, ApiError>`; the `IntoResponse` impl maps each
//! variant to a status code and a JSON `{"message": ...}` body, capturing
//! server errors to Sentry first. Internal detail never reaches clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::middleware::auth::AuthError;
use crate::payments::{GatewayError, SignatureError};
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Attempted re-payment of a paid order.
    #[error("order already paid")]
    AlreadyPaid,

    /// A line item exceeds recorded stock.
    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    /// An inbound notification failed authenticity verification.
    #[error("signature verification failed: {0}")]
    SignatureVerification(#[from] SignatureError),

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A payment processor call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Store(_) | Self::Gateway(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_)
            | Self::AlreadyPaid
            | Self::InsufficientStock(_)
            | Self::SignatureVerification(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(err) => err.to_string(),
            Self::Forbidden(msg) => msg.clone(),
            Self::AlreadyPaid => "Order already paid".to_owned(),
            Self::InsufficientStock(name) => format!("Insufficient stock for {name}"),
            Self::SignatureVerification(_) => "Invalid notification signature".to_owned(),
            Self::Gateway(_) => "Payment processor error".to_owned(),
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_owned(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes_match_taxonomy() {
        assert_eq!(
            status_of(ApiError::Validation("No order items".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::NotFound("Order".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Forbidden("Admins only".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(ApiError::AlreadyPaid), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ApiError::InsufficientStock("Karoo throw".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::SignatureVerification(SignatureError::Mismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_does_not_leak() {
        let response =
            ApiError::Internal("connection string postgres://x:y@z".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["message"], "Internal server error");
    }

    #[test]
    fn test_insufficient_stock_names_the_item() {
        let err = ApiError::InsufficientStock("Aloe planter".into());
        assert_eq!(err.to_string(), "insufficient stock for Aloe planter");
    }
}
