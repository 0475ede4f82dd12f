// SPDX-License-Identifier: MIT

//! Calendar provider OAuth client.
//!
//! Standard authorization-code exchange against the provider's token
//! endpoint. The response's relative `expires_in` is converted to an
//! absolute expiry timestamp at exchange time before storage.

use crate::error::AppError;
use crate::models::CalendarTokens;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Calendar OAuth HTTP client.
#[derive(Clone)]
pub struct CalendarOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

impl CalendarOAuthClient {
    pub fn new(client_id: String, client_secret: String, token_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            token_url,
        }
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CalendarTokens, AppError> {
        if self.client_secret.is_empty() {
            return Err(AppError::Configuration("CALENDAR_CLIENT_SECRET"));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Calendar token exchange failed");
            return Err(AppError::Provider(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let exchanged: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(format!("Token response: {}", e)))?;

        Ok(build_tokens(exchanged))
    }
}

/// Compute the absolute expiry and assemble the stored token record.
fn build_tokens(response: TokenExchangeResponse) -> CalendarTokens {
    let expires_at = Utc::now() + Duration::seconds(response.expires_in);

    CalendarTokens {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at: expires_at.to_rfc3339(),
    }
}
