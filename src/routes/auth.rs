// SPDX-License-Identifier: MIT

//! Session issuance and calendar OAuth routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::User;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Routes that need no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", get(logout))
}

/// Session-holding routes (mounted behind `require_auth`).
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/calendar", get(calendar_start))
        .route("/auth/calendar/callback", get(calendar_callback))
}

// ─── Session Issuance ────────────────────────────────────────

/// Claims in the identity provider's short-lived ID token.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    /// Opaque subject identifier
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    #[allow(dead_code)]
    exp: usize,
}

#[derive(Deserialize)]
struct SessionRequest {
    /// ID token from the identity provider
    id_token: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub name: String,
}

/// Exchange an identity-provider ID token for a session.
///
/// Verifies the ID token, upserts the internal user record keyed by the
/// provider subject (created on first sign-in, profile fields refreshed on
/// later ones), and issues a session JWT as both cookie and response body.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let key = DecodingKey::from_secret(&state.config.identity_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<IdentityClaims>(&payload.id_token, &key, &validation)
        .map_err(|_| AppError::InvalidToken)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().to_rfc3339();
    let user = match state.db.get_user_by_subject(&claims.sub).await? {
        Some(mut existing) => {
            // Refresh profile fields when the provider reports changes
            if let Some(name) = claims.name {
                existing.name = name;
            }
            if claims.email.is_some() {
                existing.email = claims.email;
            }
            if claims.picture.is_some() {
                existing.image_url = claims.picture;
            }
            state.db.upsert_user(&existing).await?;
            existing
        }
        None => {
            let user = User {
                id: uuid::Uuid::new_v4().to_string(),
                identity_subject: claims.sub.clone(),
                name: claims.name.unwrap_or_else(|| "New user".to_string()),
                email: claims.email,
                image_url: claims.picture,
                created_at: now,
            };
            state.db.upsert_user(&user).await?;
            tracing::info!(user_id = %user.id, "User created on first sign-in");
            user
        }
    };

    let jwt = create_jwt(&user.identity_subject, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, jwt.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            token: jwt,
            user_id: user.id,
            name: user.name,
        }),
    ))
}

/// Logout - clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(SESSION_COOKIE), Redirect::temporary("/"))
}

// ─── Calendar OAuth ──────────────────────────────────────────

/// Query parameters for starting the calendar OAuth flow.
#[derive(Deserialize)]
pub struct CalendarStartParams {
    /// Frontend URL to redirect back to after OAuth completes.
    /// If not provided, uses the configured frontend URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Derive the externally visible callback URL from request headers.
fn callback_url(headers: &axum::http::HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/calendar/callback", scheme, host)
}

/// Start the calendar OAuth flow - redirect to the provider.
async fn calendar_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    // Encode frontend URL + timestamp in state
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    // Create the data payload: "frontend_url|timestamp_hex"
    let state_payload = format!("{}|{:x}", frontend_url, timestamp);

    // Sign the payload
    let mut mac = HmacSha256::new_from_slice(&state.config.oauth_state_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    // Combine payload + signature: "payload|signature_hex"
    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    let oauth_state = URL_SAFE_NO_PAD.encode(signed_state.as_bytes());

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope=calendar.events&access_type=offline&state={}",
        state.config.calendar_auth_url,
        state.config.calendar_client_id,
        urlencoding::encode(&callback_url(&headers)),
        oauth_state
    );

    tracing::info!(
        client_id = %state.config.calendar_client_id,
        frontend_url = %frontend_url,
        "Starting calendar OAuth flow"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Calendar OAuth callback - exchange code for tokens, store them.
async fn calendar_callback(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    headers: axum::http::HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    // Decode and verify frontend URL from state parameter
    let frontend_url = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from calendar provider");
        let redirect = format!("{}?calendar_error={}", frontend_url, error);
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let user = state.guard.require_user(&auth_user).await?;

    tracing::info!(user_id = %user.id, "Exchanging calendar authorization code");

    let tokens = state
        .calendar_oauth
        .exchange_code(&code, &callback_url(&headers))
        .await?;

    state.db.set_calendar_tokens(&user.id, &tokens).await?;

    tracing::info!(user_id = %user.id, "Calendar connected");

    Ok(Redirect::temporary(&format!(
        "{}?calendar=connected",
        frontend_url
    )))
}

/// Verify HMAC signature and decode the frontend URL from the OAuth state
/// parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_state(secret: &[u8], frontend_url: &str) -> String {
        let payload = format!("{}|{:x}", frontend_url, 1234567890u128);
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes())
    }

    #[test]
    fn test_verify_and_decode_state_success() {
        let secret = b"secret_key";
        let encoded = signed_state(secret, "https://example.com");

        let result = verify_and_decode_state(&encoded, secret);
        assert_eq!(result, Some("https://example.com".to_string()));
    }

    #[test]
    fn test_verify_and_decode_state_wrong_secret() {
        let encoded = signed_state(b"secret_key", "https://example.com");
        assert_eq!(verify_and_decode_state(&encoded, b"wrong_key"), None);
    }

    #[test]
    fn test_verify_and_decode_state_tampered_payload() {
        let secret = b"secret_key";
        let encoded = signed_state(secret, "https://example.com");

        // Re-point the payload at an attacker URL, keeping the signature
        let decoded = URL_SAFE_NO_PAD.decode(&encoded).unwrap();
        let tampered = String::from_utf8(decoded)
            .unwrap()
            .replace("example.com", "evil.example");
        let tampered = URL_SAFE_NO_PAD.encode(tampered.as_bytes());

        assert_eq!(verify_and_decode_state(&tampered, secret), None);
    }

    #[test]
    fn test_verify_and_decode_state_malformed() {
        let secret = b"secret_key";
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_and_decode_state(&encoded, secret), None);
    }
}
