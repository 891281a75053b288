use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
};

/// Claims
///
/// Payload expected inside a JSON Web Token. Tokens are issued elsewhere; this service only
/// validates them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the calling user.
    pub sub: Uuid,
    /// Expiration Time (exp): Timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat): Timestamp when the JWT was issued.
    pub iat: usize,
}

/// Identity
///
/// The caller id resolved by authentication. It is stored as a request extension and is
/// the only thing later stages know about the caller until the gate consults the
/// directory. It is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

/// resolve_identity
///
/// Turns request headers into an `Identity`.
///
/// 1. Local Bypass: in `Env::Local` a UUID in the `x-user-id` header is accepted as-is.
/// 2. Token Validation: otherwise a `Bearer` JWT is required and must verify against the
///    configured secret with expiry checking enabled.
///
/// No directory lookup happens here; role resolution belongs to the access gate.
pub fn resolve_identity(headers: &HeaderMap, config: &AppConfig) -> Result<Identity, AppError> {
    if config.env == Env::Local {
        let bypass = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id_str| Uuid::parse_str(id_str).ok());
        if let Some(user_id) = bypass {
            return Ok(Identity { user_id });
        }
    }
    // Production, or the bypass header was absent or malformed: fall through to JWT.

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = ?e.kind(), "rejected bearer token");
        AppError::Unauthorized
    })?;

    Ok(Identity {
        user_id: token_data.claims.sub,
    })
}

/// authenticate
///
/// Middleware that runs ahead of the admin pipeline. On success the resolved `Identity`
/// is attached to the request extensions; on failure the request is rejected with 401
/// before any later stage executes.
pub async fn authenticate(
    State(config): State<AppConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = resolve_identity(request.headers(), &config)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
