// SPDX-License-Identifier: MIT

//! Project and owned-resource models.
//!
//! A project is the top-level container scoping everything a user owns.
//! Every other record here carries a `project_id` back-reference and is
//! reachable only through its owning project.

use serde::{Deserialize, Serialize};

/// Project stored in the document store. Owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project ID (also used as document ID)
    pub id: String,
    /// Internal ID of the owning user (indexed)
    pub owner_user_id: String,
    /// Display name
    pub name: String,
    /// URL of the connected social profile
    pub source_profile_url: String,
    /// Whether a profile fetch/analysis is currently in progress
    pub is_fetching: bool,
    /// Profile bio captured at connect time
    pub profile_bio: Option<String>,
    /// Follower count captured at connect time
    pub profile_followers: Option<u64>,
    /// Post count captured at connect time
    pub profile_post_count: Option<u64>,
    /// When the project was created (ISO 8601)
    pub created_at: String,
}

/// Partial project update with explicit optional fields.
///
/// Only fields that are `Some` are written; everything else is preserved
/// by a fetch-merge-write in the db layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub is_fetching: Option<bool>,
    pub profile_bio: Option<String>,
    pub profile_followers: Option<u64>,
    pub profile_post_count: Option<u64>,
}

impl ProjectPatch {
    /// True when no field is set (nothing to write).
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.is_fetching.is_none()
            && self.profile_bio.is_none()
            && self.profile_followers.is_none()
            && self.profile_post_count.is_none()
    }

    /// Merge the defined fields onto an existing project.
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(is_fetching) = self.is_fetching {
            project.is_fetching = is_fetching;
        }
        if let Some(bio) = &self.profile_bio {
            project.profile_bio = Some(bio.clone());
        }
        if let Some(followers) = self.profile_followers {
            project.profile_followers = Some(followers);
        }
        if let Some(post_count) = self.profile_post_count {
            project.profile_post_count = Some(post_count);
        }
    }
}

/// A post scraped from the connected source profile.
///
/// Source posts use replace-all semantics: re-fetching a profile deletes the
/// existing set and inserts the new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePost {
    /// Post ID (also used as document ID)
    pub id: String,
    /// Owning project (indexed)
    pub project_id: String,
    /// Post caption text
    pub caption: String,
    /// Public image URL on the source platform
    pub image_url: Option<String>,
    /// When the post was published on the source platform (ISO 8601)
    pub posted_at: Option<String>,
}

/// A user-uploaded reference image for generation styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Record ID (also used as document ID)
    pub id: String,
    /// Owning project (indexed)
    pub project_id: String,
    /// Opaque blob-store reference (resolved to a URL at read time)
    pub storage_ref: String,
    /// When the image was uploaded (ISO 8601)
    pub created_at: String,
}

/// A user-uploaded context image (product shots, brand assets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextImage {
    /// Record ID (also used as document ID)
    pub id: String,
    /// Owning project (indexed)
    pub project_id: String,
    /// Opaque blob-store reference (resolved to a URL at read time)
    pub storage_ref: String,
    /// User-supplied label describing the image
    pub label: Option<String>,
    /// When the image was uploaded (ISO 8601)
    pub created_at: String,
}

/// A calendar entry scheduling an artifact for publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    /// Record ID (also used as document ID)
    pub id: String,
    /// Owning project (indexed)
    pub project_id: String,
    /// The artifact to publish
    pub artifact_id: String,
    /// When the post should go out (ISO 8601)
    pub scheduled_for: String,
    /// When the entry was created (ISO 8601)
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: "p1".to_string(),
            owner_user_id: "u1".to_string(),
            name: "Spring campaign".to_string(),
            source_profile_url: "https://instagram.com/acme".to_string(),
            is_fetching: true,
            profile_bio: Some("Coffee roasters".to_string()),
            profile_followers: Some(1200),
            profile_post_count: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_patch_applies_only_defined_fields() {
        let mut project = sample_project();
        let patch = ProjectPatch {
            name: Some("Summer campaign".to_string()),
            is_fetching: Some(false),
            ..Default::default()
        };

        patch.apply(&mut project);

        assert_eq!(project.name, "Summer campaign");
        assert!(!project.is_fetching);
        // Untouched fields are preserved
        assert_eq!(project.profile_bio.as_deref(), Some("Coffee roasters"));
        assert_eq!(project.profile_followers, Some(1200));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut project = sample_project();
        let before = project.clone();

        let patch = ProjectPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut project);

        assert_eq!(project.name, before.name);
        assert_eq!(project.is_fetching, before.is_fetching);
        assert_eq!(project.profile_bio, before.profile_bio);
    }
}
