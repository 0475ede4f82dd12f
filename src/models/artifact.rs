// SPDX-License-Identifier: MIT

//! Generated artifact and version-history models.

use serde::{Deserialize, Serialize};

/// Conventional action tags for version records.
///
/// The engine accepts any string, but these values drive `status`
/// transitions on the artifact.
pub mod actions {
    pub const CREATE: &str = "create";
    pub const REGENERATE: &str = "regenerate";
    pub const RESTORE: &str = "restore";
}

/// Current state of one piece of generated content (caption + image).
///
/// Mutated in place by regenerate/restore; every mutation is mirrored by an
/// immutable [`VersionRecord`], so the current fields always equal some
/// version's fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Artifact ID (also used as document ID)
    pub id: String,
    /// Owning project (indexed)
    pub project_id: String,
    /// Current caption text
    pub caption: String,
    /// Opaque blob-store reference for the current image
    pub image_storage_ref: Option<String>,
    /// Prompt that produced the current image
    pub image_prompt: Option<String>,
    /// Status tag: "draft", "generated", or "regenerated"
    pub status: String,
    /// Last mutation timestamp (ISO 8601)
    pub updated_at: String,
}

/// Immutable snapshot of an artifact's fields at one point in time.
///
/// `version_number` values per artifact form a dense ascending sequence
/// starting at 1. Records are never mutated or deleted except by the
/// project cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Record ID (also used as document ID)
    pub id: String,
    /// The artifact this version belongs to (indexed)
    pub artifact_id: String,
    /// 1-based position in the artifact's history (indexed with artifact_id)
    pub version_number: u32,
    /// Caption at this version
    pub caption: String,
    /// Image blob reference at this version
    pub image_storage_ref: Option<String>,
    /// Image prompt at this version
    pub image_prompt: Option<String>,
    /// What produced this version ("create", "regenerate", "restore", ...)
    pub action: String,
    /// User feedback that drove this version, or a restore note
    pub feedback: Option<String>,
    /// Text model that generated the caption
    pub model: Option<String>,
    /// Image model that generated the image
    pub image_model: Option<String>,
    /// When this version was recorded (ISO 8601)
    pub created_at: String,
}

/// Fields captured into a new version (the snapshot-able subset of the
/// artifact plus per-version metadata).
#[derive(Debug, Clone, Default)]
pub struct VersionFields {
    pub caption: String,
    pub image_storage_ref: Option<String>,
    pub image_prompt: Option<String>,
    pub feedback: Option<String>,
    pub model: Option<String>,
    pub image_model: Option<String>,
}

impl VersionFields {
    /// Snapshot the current state of an artifact.
    pub fn from_artifact(artifact: &GeneratedArtifact) -> Self {
        Self {
            caption: artifact.caption.clone(),
            image_storage_ref: artifact.image_storage_ref.clone(),
            image_prompt: artifact.image_prompt.clone(),
            ..Default::default()
        }
    }
}
