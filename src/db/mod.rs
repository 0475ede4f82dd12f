// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{CascadeResult, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROJECTS: &str = "projects";
    pub const SOURCE_POSTS: &str = "source_posts";
    pub const REFERENCE_IMAGES: &str = "reference_images";
    pub const CONTEXT_IMAGES: &str = "context_images";
    pub const SCHEDULED_POSTS: &str = "scheduled_posts";
    pub const ARTIFACTS: &str = "artifacts";
    /// Append-only version history (keyed by artifact_id + version_number)
    pub const ARTIFACT_VERSIONS: &str = "artifact_versions";
    /// Calendar OAuth tokens (keyed by user id)
    pub const CALENDAR_TOKENS: &str = "calendar_tokens";
}
