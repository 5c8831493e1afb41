//! Authentication middleware and extractors.
//!
//! Clients authenticate with an `Authorization: Bearer <jwt>` header. The
//! token is an HS256 JWT signed with `JWT_SECRET`, carrying the user's
//! identity and admin flag. Route handlers opt in with the [`RequireAuth`]
//! and [`RequireAdmin`] extractors.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowtoo_core::{Email, UserId};

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

const TOKEN_TTL_DAYS: i64 = 30;

/// Authentication failures, all answered with 401.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingToken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token could not be issued")]
    TokenCreation,
}

/// JWT claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued at, seconds since epoch.
    pub iat: i64,
}

/// The authenticated caller, decoded from a verified token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let email = Email::parse(&claims.email).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            id: claims.sub,
            name: claims.name,
            email,
            is_admin: claims.is_admin,
        })
    }
}

/// Sign a 30-day access token for `user`.
///
/// # Errors
///
/// Returns [`AuthError::TokenCreation`] if signing fails.
pub fn issue_token(user: &User, secret: &SecretString) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.to_string(),
        name: user.name.clone(),
        is_admin: user.is_admin,
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        iat: now.timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|_| AuthError::TokenCreation)
}

/// Verify a token and return its claims.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] on a bad signature, expiry, or
/// malformed token.
pub fn decode_token(token: &str, secret: &SecretString) -> Result<Claims, AuthError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = decode_token(token, &app.config().jwt_secret)?;
        Ok(Self(CurrentUser::try_from(claims)?))
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden("Admins only".to_owned()));
        }
        Ok(Self(user))
    }
}
