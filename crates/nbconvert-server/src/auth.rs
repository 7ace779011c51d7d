//! Authentication and authorization gate.
//!
//! Requests authenticate with `Authorization: Bearer <jwt>` (HS256, signed
//! with `JWT_SECRET`). The token's `scope` claim is a space-separated list of
//! `resource:action` permissions, e.g. `nbconvert:read nbconvert:write`.
//!
//! When `allow_dev_identity` is on, requests without an Authorization header
//! get a dev identity holding every scope.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Resource name guarding the exporter capability endpoints.
pub const AUTH_RESOURCE: &str = "nbconvert";

/// Subject of the dev identity.
pub const DEV_SUBJECT: &str = "dev";

/// All scopes granted to the dev identity.
const ALL_SCOPES: &[&str] = &["nbconvert:read", "nbconvert:write"];

/// JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user name or ID).
    pub sub: String,
    /// Space-separated scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Expiration time (unix timestamp).
    pub exp: usize,
    /// Issued at (unix timestamp).
    pub iat: usize,
}

/// Authenticated caller extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub scopes: Vec<String>,
}

impl AuthenticatedUser {
    /// The dev identity, holding every scope.
    pub fn dev() -> Self {
        Self {
            subject: DEV_SUBJECT.to_string(),
            scopes: ALL_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Check that `user` may perform `action` on `resource`.
///
/// If `config.enforce_scopes` is false, this always succeeds.
pub fn authorize(
    user: &AuthenticatedUser,
    resource: &str,
    action: &str,
    config: &ServerConfig,
) -> Result<(), ApiError> {
    if !config.enforce_scopes {
        return Ok(());
    }
    let scope = format!("{}:{}", resource, action);
    if user.has_scope(&scope) {
        Ok(())
    } else {
        tracing::debug!(subject = %user.subject, %scope, "Missing scope");
        Err(ApiError::Forbidden(format!("Missing required scope: {}", scope)))
    }
}

/// Create a JWT token.
///
/// Fails if `expiry_hours` puts the expiry outside chrono's representable range.
pub fn create_token(
    subject: &str,
    scopes: &[&str],
    secret: &str,
    expiry_hours: i64,
) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let exp = chrono::Duration::try_hours(expiry_hours)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| ApiError::Internal(format!("Token expiry out of range: {} hours", expiry_hours)))?
        .timestamp() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        scope: Some(scopes.join(" ")),
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to create token: {}", e)))
}

/// Validate a JWT token and return claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthorized(format!("Invalid token: {}", e))
    })?;

    Ok(token_data.claims)
}

/// Resolve the caller from request headers.
pub fn authenticate(parts: &Parts, config: &ServerConfig) -> Result<AuthenticatedUser, ApiError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        if config.allow_dev_identity {
            tracing::warn!("No auth provided, using dev identity");
            return Ok(AuthenticatedUser::dev());
        }
        return Err(ApiError::Unauthorized(
            "Missing Authorization: Bearer <jwt> header".into(),
        ));
    };

    let auth_str = auth_header.to_str().map_err(|_| {
        ApiError::Unauthorized("Authorization header contains invalid characters".into())
    })?;

    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("Authorization header must be Bearer <token>".to_string())
    })?;

    if config.jwt_secret.is_empty() {
        return Err(ApiError::Internal("JWT_SECRET not configured on server".into()));
    }

    let claims = validate_token(token.trim(), &config.jwt_secret)?;
    let scopes = claims
        .scope
        .unwrap_or_default()
        .split_whitespace()
        .map(String::from)
        .collect();

    Ok(AuthenticatedUser {
        subject: claims.sub,
        scopes,
    })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state.config())
    }
}
