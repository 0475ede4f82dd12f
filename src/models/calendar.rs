// SPDX-License-Identifier: MIT

//! Calendar integration token model.

use serde::{Deserialize, Serialize};

/// OAuth tokens for the calendar provider, keyed by user ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarTokens {
    /// Access token from the token endpoint
    pub access_token: String,
    /// Refresh token from the token endpoint
    pub refresh_token: String,
    /// Absolute expiry computed from `expires_in` at exchange time (ISO 8601)
    pub expires_at: String,
}
