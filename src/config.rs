// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and cached in memory; handlers never
//! touch the environment directly.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// GCP project ID (document store)
    pub gcp_project_id: String,
    /// Blob storage bucket name
    pub storage_bucket: String,
    /// AI provider API base URL
    pub ai_api_url: String,
    /// Calendar OAuth client ID (public)
    pub calendar_client_id: String,
    /// Calendar OAuth authorize/token endpoints
    pub calendar_auth_url: String,
    pub calendar_token_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// AI provider API key
    pub ai_api_key: String,
    /// Calendar OAuth client secret
    pub calendar_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret for identity-provider ID tokens
    pub identity_signing_key: Vec<u8>,
    /// HMAC key for signing OAuth state parameters
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In production, secrets are injected as environment variables by the
    /// deployment platform's secret bindings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .map_err(|_| ConfigError::Missing("STORAGE_BUCKET"))?,
            ai_api_url: env::var("AI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            calendar_client_id: env::var("CALENDAR_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("CALENDAR_CLIENT_ID"))?,
            calendar_auth_url: env::var("CALENDAR_AUTH_URL").unwrap_or_else(|_| {
                "https://accounts.google.com/o/oauth2/v2/auth".to_string()
            }),
            calendar_token_url: env::var("CALENDAR_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            // External-service credentials may be absent; the owning client
            // reports a configuration error at request time rather than
            // keeping the whole service from starting.
            ai_api_key: env::var("AI_API_KEY")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            calendar_client_secret: env::var("CALENDAR_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            identity_signing_key: env::var("IDENTITY_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("IDENTITY_SIGNING_KEY"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-bucket".to_string(),
            ai_api_url: "http://localhost:9999/v1".to_string(),
            calendar_client_id: "test_client_id".to_string(),
            calendar_auth_url: "http://localhost:9999/auth".to_string(),
            calendar_token_url: "http://localhost:9999/token".to_string(),
            port: 8080,
            ai_api_key: "test_ai_key".to_string(),
            calendar_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            identity_signing_key: b"test_identity_key_32_bytes_min!".to_vec(),
            oauth_state_key: b"test_state_key".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("STORAGE_BUCKET", "bucket");
        env::set_var("CALENDAR_CLIENT_ID", "cal_id");
        env::set_var("CALENDAR_CLIENT_SECRET", "cal_secret");
        env::set_var("AI_API_KEY", "ai_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("IDENTITY_SIGNING_KEY", "test_identity_key_32_bytes_min!");
        env::set_var("OAUTH_STATE_KEY", "state_key");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.storage_bucket, "bucket");
        assert_eq!(config.calendar_client_id, "cal_id");
        assert_eq!(config.ai_api_key, "ai_key");
        assert_eq!(config.port, 8080);
    }
}
