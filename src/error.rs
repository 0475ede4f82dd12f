// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Authorization failures on reads never reach this type (read handlers
//! degrade to empty results); everything that does reach it maps to a
//! stable error kind and a pre-written, non-technical message. Raw
//! provider/database error bodies are logged, never returned to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Not authorized for this resource")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing required credential: {0}")]
    Configuration(&'static str),

    #[error("AI provider rate limit exceeded")]
    RateLimit,

    #[error("Malformed response from provider: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Stable machine-readable kind string for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration_error",
            AppError::RateLimit => "rate_limit",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Network(_) => "network_error",
            AppError::Provider(_) => "provider_error",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Pre-written user-facing message. Never contains provider bodies.
    fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Please sign in to continue.".to_string(),
            AppError::Unauthorized => "You don't have access to this resource.".to_string(),
            AppError::InvalidToken => "Your session has expired. Please sign in again.".to_string(),
            AppError::NotFound(_) => "The requested resource could not be found.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Configuration(_) => {
                "The service is not fully configured. Please try again later.".to_string()
            }
            AppError::RateLimit => {
                "The content generator is busy right now. Please try again in a moment.".to_string()
            }
            AppError::MalformedResponse(_) => {
                "The content generator returned an unexpected result. Please try again.".to_string()
            }
            AppError::Network(_) => {
                "We couldn't reach an external service. Please try again.".to_string()
            }
            AppError::Provider(_) => "Content generation failed. Please try again.".to_string(),
            AppError::Database(_) | AppError::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthenticated | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::MalformedResponse(_) | AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Network(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Server-side detail stays in the logs.
        match &self {
            AppError::Configuration(name) => {
                tracing::error!(credential = name, "Missing required credential")
            }
            AppError::MalformedResponse(msg) => {
                tracing::error!(error = %msg, "Malformed provider response")
            }
            AppError::Network(msg) => tracing::warn!(error = %msg, "Network error"),
            AppError::Provider(msg) => tracing::error!(error = %msg, "Provider error"),
            AppError::Database(msg) => tracing::error!(error = %msg, "Database error"),
            AppError::Internal(err) => tracing::error!(error = %err, "Internal server error"),
            _ => {}
        }

        let details = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => Some(msg.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.user_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(AppError::Unauthenticated.kind(), "unauthenticated");
        assert_eq!(AppError::Unauthorized.kind(), "unauthorized");
        assert_eq!(AppError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(AppError::RateLimit.kind(), "rate_limit");
        assert_eq!(
            AppError::MalformedResponse("x".into()).kind(),
            "malformed_response"
        );
        assert_eq!(AppError::Provider("x".into()).kind(), "provider_error");
    }

    #[test]
    fn test_provider_body_never_in_user_message() {
        let err = AppError::Provider("HTTP 500: internal stack trace".to_string());
        assert!(!err.user_message().contains("stack trace"));

        let err = AppError::Database("connection string leaked".to_string());
        assert!(!err.user_message().contains("connection"));
    }
}
