//! Stripe webhook-gateway adapter.
//!
//! Payment initiation creates a hosted Checkout Session over Stripe's REST
//! API; Stripe later POSTs a JSON webhook signed with a shared secret
//! (`Stripe-Signature: t=<unix>,v1=<hmac-sha256-hex>`). Nothing in the
//! webhook body is trusted until the signature verifies.
//!
//! Amounts cross the wire in minor units (cents): unit prices are converted
//! with [`to_minor_units`], which rounds rather than truncates.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use flowtoo_core::to_minor_units;

use crate::config::StripeConfig;
use crate::models::{Order, User};

use super::{GatewayError, PaymentEvent, PaymentOutcome};

/// Processor label recorded on orders paid through this adapter.
pub const PROCESSOR: &str = "Stripe";

/// Webhook timestamps older than this are rejected as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Why a webhook signature was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing or malformed")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("signature mismatch")]
    Mismatch,
}

/// A hosted checkout session the shopper is redirected to.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// The Stripe webhook-gateway adapter.
#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    config: StripeConfig,
    client_url: String,
}

impl StripeGateway {
    #[must_use]
    pub fn new(config: StripeConfig, client_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            client_url,
        }
    }

    /// Create a hosted checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the HTTP call fails, the response has no
    /// redirect URL, or an amount does not convert to minor units.
    pub async fn create_checkout_session(
        &self,
        order: &Order,
        user: &User,
    ) -> Result<CheckoutSession, GatewayError> {
        let params = self.checkout_params(order, user)?;

        let session: CheckoutSession = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if session.url.is_none() {
            return Err(GatewayError::MalformedResponse(
                "checkout session has no redirect url".to_owned(),
            ));
        }
        Ok(session)
    }

    /// Build the form parameters for a checkout session.
    fn checkout_params(
        &self,
        order: &Order,
        user: &User,
    ) -> Result<Vec<(String, String)>, GatewayError> {
        let mut params = vec![
            ("mode".to_owned(), "payment".to_owned()),
            ("payment_method_types[0]".to_owned(), "card".to_owned()),
            (
                "success_url".to_owned(),
                format!("{}/success?orderId={}", self.client_url, order.id),
            ),
            ("cancel_url".to_owned(), format!("{}/cancel", self.client_url)),
            ("customer_email".to_owned(), user.email.to_string()),
            ("metadata[orderId]".to_owned(), order.id.to_string()),
            ("metadata[userId]".to_owned(), user.id.to_string()),
        ];

        for (i, item) in order.order_items.iter().enumerate() {
            let unit_amount =
                to_minor_units(item.price).ok_or(GatewayError::AmountOutOfRange)?;
            params.push((
                format!("line_items[{i}][price_data][currency]"),
                self.config.currency.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                item.image.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                unit_amount.to_string(),
            ));
            params.push((format!("line_items[{i}][quantity]"), item.qty.to_string()));
        }

        Ok(params)
    }

    /// Verify a webhook signature header against the raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the header is malformed, the
    /// timestamp is outside tolerance, or no `v1` signature matches.
    pub fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_signature_at(payload, header, Utc::now().timestamp())
    }

    fn verify_signature_at(
        &self,
        payload: &[u8],
        header: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(SignatureError::MalformedHeader);
        }
        if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(SignatureError::StaleTimestamp);
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        if signatures.iter().any(|s| *s == expected) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Verify and normalize a webhook notification.
    ///
    /// Only `checkout.session.completed` produces an event; every other
    /// event type is acknowledged without one (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when verification fails; the caller must
    /// reject the notification so Stripe retries it.
    pub fn parse_webhook(
        &self,
        payload: &[u8],
        header: &str,
    ) -> Result<Option<PaymentEvent>, SignatureError> {
        self.verify_signature(payload, header)?;

        let Ok(event) = serde_json::from_slice::<Value>(payload) else {
            tracing::warn!("signed webhook payload is not valid JSON, ignoring");
            return Ok(None);
        };

        let event_type = event["type"].as_str().unwrap_or_default();
        if event_type != "checkout.session.completed" {
            tracing::debug!(event_type, "ignoring webhook event type");
            return Ok(None);
        }

        let session = &event["data"]["object"];
        let settled_at = event["created"].as_i64().and_then(timestamp_to_datetime);

        Ok(Some(PaymentEvent {
            order_ref: session["metadata"]["orderId"]
                .as_str()
                .unwrap_or_default()
                .to_owned(),
            outcome: PaymentOutcome::Completed,
            transaction_id: session["payment_intent"].as_str().map(str::to_owned),
            processor: PROCESSOR,
            raw_status: session["payment_status"]
                .as_str()
                .unwrap_or("complete")
                .to_owned(),
            payer_email: session["customer_email"]
                .as_str()
                .or_else(|| session["customer_details"]["email"].as_str())
                .map(str::to_owned),
            settled_at,
            raw: event,
        }))
    }
}

fn timestamp_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
