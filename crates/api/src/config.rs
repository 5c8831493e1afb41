//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Token signing secret (min 32 chars, not a placeholder)
//! - `PAYFAST_MERCHANT_ID` - PayFast merchant ID
//! - `PAYFAST_MERCHANT_KEY` - PayFast merchant key
//! - `PAYFAST_RETURN_URL` - Where PayFast sends the shopper on success
//! - `PAYFAST_CANCEL_URL` - Where PayFast sends the shopper on cancel
//! - `PAYFAST_NOTIFY_URL` - Public URL of our IPN endpoint
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret (whsec_...)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 4000)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory store when unset
//! - `CLIENT_URL` - Shop frontend origin (default: http://localhost:3000)
//! - `PAYFAST_PROCESS_URL` - Redirect endpoint (default: PayFast sandbox)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: https://api.stripe.com)
//! - `STRIPE_CURRENCY` - Checkout currency code (default: zar)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const DEFAULT_PAYFAST_PROCESS_URL: &str = "https://sandbox.payfast.co.za/eng/process";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` connection URL (contains password); `None` selects the
    /// in-memory store
    pub database_url: Option<SecretString>,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Shop frontend origin, used for CORS and redirect targets
    pub client_url: String,
    /// PayFast gateway configuration
    pub payfast: PayfastConfig,
    /// Stripe gateway configuration
    pub stripe: StripeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// PayFast gateway configuration.
///
/// Implements `Debug` manually to redact the merchant key.
#[derive(Clone)]
pub struct PayfastConfig {
    /// PayFast merchant ID
    pub merchant_id: String,
    /// PayFast merchant key
    pub merchant_key: SecretString,
    /// Where PayFast sends the shopper after a successful payment
    pub return_url: String,
    /// Where PayFast sends the shopper after a cancelled payment
    pub cancel_url: String,
    /// Public URL of our IPN endpoint
    pub notify_url: String,
    /// PayFast redirect endpoint (sandbox or live)
    pub process_url: String,
}

impl std::fmt::Debug for PayfastConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayfastConfig")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_key", &"[REDACTED]")
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("notify_url", &self.notify_url)
            .field("process_url", &self.process_url)
            .finish()
    }
}

impl PayfastConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            merchant_id: get_required_env("PAYFAST_MERCHANT_ID")?,
            merchant_key: get_required_secret("PAYFAST_MERCHANT_KEY")?,
            return_url: get_required_env("PAYFAST_RETURN_URL")?,
            cancel_url: get_required_env("PAYFAST_CANCEL_URL")?,
            notify_url: get_required_env("PAYFAST_NOTIFY_URL")?,
            process_url: get_env_or_default("PAYFAST_PROCESS_URL", DEFAULT_PAYFAST_PROCESS_URL),
        })
    }
}

/// Stripe gateway configuration.
///
/// Implements `Debug` manually to redact the API and webhook secrets.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe API secret key (sk_...)
    pub secret_key: SecretString,
    /// Webhook signing secret (whsec_...)
    pub webhook_secret: SecretString,
    /// Stripe API base URL
    pub api_base: String,
    /// ISO currency code for checkout sessions
    pub currency: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .finish()
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_required_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_required_secret("STRIPE_WEBHOOK_SECRET")?,
            api_base: get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
            currency: get_env_or_default("STRIPE_CURRENCY", "zar"),
        })
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the JWT secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("API_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("API_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_PORT".to_string(), e.to_string()))?;
        let database_url = get_optional_env("DATABASE_URL").map(SecretString::from);
        let jwt_secret = get_required_secret("JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;
        let client_url = get_env_or_default("CLIENT_URL", "http://localhost:3000");

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            client_url,
            payfast: PayfastConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the JWT secret is long enough and not a placeholder.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_jwt_secret(&secret, "TEST_SECRET").is_err());
    }

    #[test]
    fn test_validate_jwt_secret_placeholder() {
        let secret = SecretString::from("your-jwt-secret-goes-right-here-ok");
        let err = validate_jwt_secret(&secret, "TEST_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_jwt_secret_valid() {
        let secret = SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6d");
        assert!(validate_jwt_secret(&secret, "TEST_SECRET").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            database_url: None,
            jwt_secret: SecretString::from("x".repeat(32)),
            client_url: "http://localhost:3000".to_string(),
            payfast: PayfastConfig {
                merchant_id: "10000100".to_string(),
                merchant_key: SecretString::from("46f0cd694581a"),
                return_url: "http://localhost:3000/success".to_string(),
                cancel_url: "http://localhost:3000/cancel".to_string(),
                notify_url: "http://localhost:4000/orders/payment/ipn".to_string(),
                process_url: DEFAULT_PAYFAST_PROCESS_URL.to_string(),
            },
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_abc"),
                webhook_secret: SecretString::from("whsec_abc"),
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
                currency: "zar".to_string(),
            },
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_payfast_config_debug_redacts_merchant_key() {
        let config = PayfastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: SecretString::from("super_secret_merchant_key"),
            return_url: "http://localhost:3000/success".to_string(),
            cancel_url: "http://localhost:3000/cancel".to_string(),
            notify_url: "http://localhost:4000/orders/payment/ipn".to_string(),
            process_url: DEFAULT_PAYFAST_PROCESS_URL.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("10000100"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_merchant_key"));
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_very_secret"),
            webhook_secret: SecretString::from("whsec_very_secret"),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            currency: "zar".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("zar"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very_secret"));
    }
}
