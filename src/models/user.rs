// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in the document store.
///
/// One record per external identity; created by upsert on the first
/// authenticated session, never deleted by normal flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID (also used as document ID)
    pub id: String,
    /// Subject identifier from the identity provider (indexed)
    pub identity_subject: String,
    /// Display name
    pub name: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Profile image URL
    pub image_url: Option<String>,
    /// When the user first signed in (ISO 8601)
    pub created_at: String,
}
