// SPDX-License-Identifier: MIT

//! JWT session authentication middleware.
//!
//! Two flavors: `require_auth` for write routes (missing/invalid session is
//! a 401), and `optional_auth` for read routes (the request always proceeds,
//! carrying `MaybeAuthUser(None)` when anonymous — read handlers fail closed
//! to empty results instead of erroring).

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "postcraft_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity-provider subject identifier)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated caller extracted from a session JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Identity-provider subject; resolved to an internal user per request.
    pub subject: String,
}

/// Caller identity for read routes; `None` when anonymous or invalid.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Extract the session token from cookie or bearer header.
fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Decode and validate a session token into an AuthUser.
fn decode_session(token: &str, signing_key: &[u8]) -> Option<AuthUser> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).ok()?;
    Some(AuthUser {
        subject: token_data.claims.sub,
    })
}

/// Middleware that requires valid JWT authentication.
///
/// Denials go through `AppError` so the response carries the same stable
/// error kind and message shape as every other failure.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&jar, &request).ok_or(AppError::Unauthenticated)?;

    let auth_user =
        decode_session(&token, &state.config.jwt_signing_key).ok_or(AppError::InvalidToken)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Middleware that attaches the caller identity when present, but never
/// rejects. Anonymous and invalid-token requests proceed with `None`.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_user = extract_token(&jar, &request)
        .and_then(|token| decode_session(&token, &state.config.jwt_signing_key));

    request.extensions_mut().insert(MaybeAuthUser(auth_user));
    next.run(request).await
}

/// Create a JWT for a user session.
pub fn create_jwt(subject: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp: now + 30 * 24 * 60 * 60, // 30 days
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_round_trip() {
        let key = b"test_jwt_key_32_bytes_minimum!!";
        let token = create_jwt("identity|abc123", key).unwrap();

        let user = decode_session(&token, key).expect("valid token should decode");
        assert_eq!(user.subject, "identity|abc123");
    }

    #[test]
    fn test_session_rejects_wrong_key() {
        let token = create_jwt("identity|abc123", b"test_jwt_key_32_bytes_minimum!!").unwrap();
        assert!(decode_session(&token, b"another_key_32_bytes_minimum!!!").is_none());
    }

    #[test]
    fn test_session_rejects_garbage() {
        assert!(decode_session("not.a.jwt", b"test_jwt_key_32_bytes_minimum!!").is_none());
    }
}
