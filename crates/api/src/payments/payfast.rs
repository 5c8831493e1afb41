//! PayFast redirect-gateway adapter.
//!
//! Payment initiation builds a signed redirect URL the shopper is sent to;
//! PayFast later calls our ITN/IPN endpoint with a form-encoded body. The
//! signature over the outbound URL is the hex MD5 of the field string in
//! **insertion order** (not sorted), with values percent-encoded and spaces
//! as `+` - encoding them as `%20` produces a different digest and PayFast
//! rejects the redirect.
//!
//! # Security
//!
//! `parse_ipn` does **not** verify the inbound notification: it trusts
//! `payment_status` as sent, which is only acceptable against the sandbox.
//! Before pointing this at the live endpoint it must (a) POST the payload
//! back to PayFast's `/eng/query/validate` for server-side confirmation,
//! (b) verify the notification signature, and (c) accept only PayFast's
//! published source addresses. None of that is implemented here.

use md5::{Digest, Md5};
use secrecy::ExposeSecret;
use serde_json::Value;

use flowtoo_core::format_amount;

use crate::config::PayfastConfig;
use crate::models::{Order, User};

use super::{PaymentEvent, PaymentOutcome};

/// Processor label recorded on orders paid through this adapter.
pub const PROCESSOR: &str = "PayFast";

/// The PayFast redirect-gateway adapter.
#[derive(Clone)]
pub struct PayfastGateway {
    config: PayfastConfig,
}

impl PayfastGateway {
    #[must_use]
    pub const fn new(config: PayfastConfig) -> Self {
        Self { config }
    }

    /// Build the signed redirect URL for an order.
    ///
    /// Field order is load-bearing: PayFast signs the concatenation in the
    /// order the fields appear, so this list must match the documented
    /// sequence exactly.
    #[must_use]
    pub fn redirect_url(&self, order: &Order, user: &User) -> String {
        let fields: [(&str, String); 9] = [
            ("merchant_id", self.config.merchant_id.clone()),
            (
                "merchant_key",
                self.config.merchant_key.expose_secret().to_owned(),
            ),
            ("return_url", self.config.return_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("notify_url", self.config.notify_url.clone()),
            ("m_payment_id", order.id.to_string()),
            ("amount", format_amount(order.total_price)),
            ("item_name", format!("Order {}", order.id)),
            ("email_address", user.email.to_string()),
        ];

        let query = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_value(v)))
            .collect::<Vec<_>>()
            .join("&");

        let signature = hex::encode(Md5::digest(query.as_bytes()));
        format!("{}?{query}&signature={signature}", self.config.process_url)
    }

    /// Parse a raw IPN body into a normalized [`PaymentEvent`].
    ///
    /// `payment_status == "COMPLETE"` maps to [`PaymentOutcome::Completed`];
    /// everything else is [`PaymentOutcome::Other`] and never mutates an
    /// order. See the module docs for the verification this deliberately
    /// does not do.
    #[must_use]
    pub fn parse_ipn(&self, raw_body: &str) -> PaymentEvent {
        let mut fields = serde_json::Map::new();
        for pair in raw_body.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            fields.insert(key.to_owned(), Value::String(decode_value(value)));
        }

        let field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let raw_status = field("payment_status").unwrap_or_default();
        let outcome = if raw_status == "COMPLETE" {
            PaymentOutcome::Completed
        } else {
            PaymentOutcome::Other
        };

        PaymentEvent {
            order_ref: field("m_payment_id").unwrap_or_default(),
            outcome,
            transaction_id: field("pf_payment_id"),
            processor: PROCESSOR,
            raw_status,
            payer_email: field("email_address"),
            settled_at: None,
            raw: Value::Object(fields),
        }
    }
}

/// Percent-encode a field value the way PayFast signs it: spaces become `+`.
fn encode_value(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Percent-decode an IPN value. `+` is left alone, matching how the values
/// were encoded on the way out.
fn decode_value(value: &str) -> String {
    urlencoding::decode(value)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtoo_core::{Email, ProductId, UserId};
    use secrecy::SecretString;

    use crate::models::{OrderItem, ShippingAddress};

    fn gateway() -> PayfastGateway {
        PayfastGateway::new(PayfastConfig {
            merchant_id: "10000100".to_owned(),
            merchant_key: SecretString::from("46f0cd694581a"),
            return_url: "https://flowtoo.shop/success".to_owned(),
            cancel_url: "https://flowtoo.shop/cancel".to_owned(),
            notify_url: "https://api.flowtoo.shop/orders/payment/ipn".to_owned(),
            process_url: "https://sandbox.payfast.co.za/eng/process".to_owned(),
        })
    }

    fn order_and_user() -> (Order, User) {
        let user = User {
            id: UserId::new(),
            name: "Thandi".to_owned(),
            email: Email::parse("thandi@example.com").expect("email"),
            is_admin: false,
        };
        let order = Order::new(
            user.id,
            vec![OrderItem {
                product: ProductId::new(),
                name: "Protea print".to_owned(),
                image: "/images/protea.jpg".to_owned(),
                qty: 1,
                price: "299.99".parse().expect("decimal"),
            }],
            ShippingAddress {
                address: "1 Bree St".to_owned(),
                city: "Cape Town".to_owned(),
                postal_code: "8001".to_owned(),
                country: "ZA".to_owned(),
            },
            "PayFast".to_owned(),
            "299.99".parse().expect("decimal"),
            "0".parse().expect("decimal"),
            "0".parse().expect("decimal"),
            "299.99".parse().expect("decimal"),
        );
        (order, user)
    }

    #[test]
    fn test_encode_value_uses_plus_for_spaces() {
        assert_eq!(encode_value("Order 123"), "Order+123");
        assert!(!encode_value("a b c").contains("%20"));
        // other reserved characters still percent-encode
        assert_eq!(encode_value("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_redirect_url_shape() {
        let (order, user) = order_and_user();
        let url = gateway().redirect_url(&order, &user);

        assert!(url.starts_with("https://sandbox.payfast.co.za/eng/process?merchant_id=10000100&"));
        assert!(url.contains("&amount=299.99&"));
        assert!(url.contains(&format!("&m_payment_id={}&", order.id)));
        assert!(url.contains(&format!("&item_name=Order+{}&", order.id)));
        assert!(url.contains("&email_address=thandi%40example.com&"));
        assert!(!url.contains("%20"));
    }

    #[test]
    fn test_redirect_url_signature_covers_query() {
        let (order, user) = order_and_user();
        let url = gateway().redirect_url(&order, &user);

        let (_, query_and_sig) = url.split_once('?').expect("query string");
        let (query, sig) = query_and_sig
            .rsplit_once("&signature=")
            .expect("signature param last");
        assert_eq!(sig, hex::encode(Md5::digest(query.as_bytes())));
    }

    #[test]
    fn test_parse_ipn_complete() {
        let body = "m_payment_id=abc-123&pf_payment_id=1089250&payment_status=COMPLETE\
                    &amount_gross=299.99&email_address=thandi%40example.com";
        let event = gateway().parse_ipn(body);

        assert_eq!(event.outcome, PaymentOutcome::Completed);
        assert_eq!(event.order_ref, "abc-123");
        assert_eq!(event.transaction_id.as_deref(), Some("1089250"));
        assert_eq!(event.payer_email.as_deref(), Some("thandi@example.com"));
        assert_eq!(event.raw_status, "COMPLETE");
        assert_eq!(event.processor, "PayFast");
        assert_eq!(event.raw["amount_gross"], "299.99");
    }

    #[test]
    fn test_parse_ipn_non_complete_is_other() {
        for status in ["FAILED", "CANCELLED", "PENDING", ""] {
            let body = format!("m_payment_id=abc&payment_status={status}");
            let event = gateway().parse_ipn(&body);
            assert_eq!(event.outcome, PaymentOutcome::Other, "status {status:?}");
        }
    }

    #[test]
    fn test_parse_ipn_tolerates_garbage() {
        let event = gateway().parse_ipn("not a form body at all");
        assert_eq!(event.outcome, PaymentOutcome::Other);
        assert!(event.order_ref.is_empty());
    }
}
