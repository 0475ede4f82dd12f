// SPDX-License-Identifier: MIT

//! Append-only versioning engine for generated artifacts.
//!
//! Every mutation to an artifact is recorded as an immutable, densely
//! numbered version record, and the artifact's current fields always equal
//! the fields of some version. Restore never rewrites history: restoring to
//! version N appends a new version whose content equals N's.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{actions, GeneratedArtifact, VersionFields, VersionRecord};
use crate::services::storage::BlobStore;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-artifact append locks, shared across all engine clones in this
/// instance. Serializes the count-then-insert version-number derivation so
/// concurrent appends within one instance cannot collide. Appends from
/// separate instances are not serialized; single-writer-per-artifact is
/// assumed across instances.
pub type AppendLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// A version record paired with its lazily resolved image URL.
pub struct VersionView {
    pub record: VersionRecord,
    pub image_url: Option<String>,
}

/// Versioning engine over the document store and blob store.
#[derive(Clone)]
pub struct VersioningEngine {
    db: FirestoreDb,
    storage: BlobStore,
    append_locks: AppendLocks,
}

impl VersioningEngine {
    pub fn new(db: FirestoreDb, storage: BlobStore, append_locks: AppendLocks) -> Self {
        Self {
            db,
            storage,
            append_locks,
        }
    }

    /// Append a new immutable version for an artifact.
    ///
    /// The artifact must exist. The version number is derived as
    /// `count + 1` under the artifact's append lock, so numbers are dense
    /// and gap-free. This does not touch the artifact's current state; that
    /// is the caller's separate, explicit step.
    pub async fn append_version(
        &self,
        artifact_id: &str,
        fields: VersionFields,
        action: &str,
    ) -> Result<VersionRecord, AppError> {
        if self.db.get_artifact(artifact_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Artifact {}", artifact_id)));
        }

        let lock = self
            .append_locks
            .entry(artifact_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let version_number = self.db.count_versions(artifact_id).await? + 1;

        let record = VersionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            artifact_id: artifact_id.to_string(),
            version_number,
            caption: fields.caption,
            image_storage_ref: fields.image_storage_ref,
            image_prompt: fields.image_prompt,
            action: action.to_string(),
            feedback: fields.feedback,
            model: fields.model,
            image_model: fields.image_model,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.insert_version(&record).await?;

        tracing::info!(
            artifact_id,
            version_number,
            action,
            "Version appended"
        );

        Ok(record)
    }

    /// Full history for an artifact, newest first, with storage refs
    /// resolved to fetchable URLs at read time.
    pub async fn history(&self, artifact_id: &str) -> Result<Vec<VersionView>, AppError> {
        let records = self.db.list_versions(artifact_id).await?;

        let views = future::join_all(records.into_iter().map(|record| async {
            let image_url = match &record.image_storage_ref {
                Some(storage_ref) => self.storage.get_url(storage_ref).await,
                None => None,
            };
            VersionView { record, image_url }
        }))
        .await;

        Ok(views)
    }

    /// Exact-match lookup on (artifact_id, version_number).
    pub async fn version(
        &self,
        artifact_id: &str,
        version_number: u32,
    ) -> Result<VersionRecord, AppError> {
        self.db
            .get_version(artifact_id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Version {} of artifact {}",
                    version_number, artifact_id
                ))
            })
    }

    /// Restore an artifact to a prior version.
    ///
    /// Copies the target version's content onto the current artifact record,
    /// then appends an `action = "restore"` version so the restore itself is
    /// auditable. Versions after the target are left untouched.
    pub async fn restore(
        &self,
        artifact_id: &str,
        version_number: u32,
    ) -> Result<VersionRecord, AppError> {
        let mut artifact = self
            .db
            .get_artifact(artifact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artifact {}", artifact_id)))?;

        let target = self.version(artifact_id, version_number).await?;

        artifact.caption = target.caption.clone();
        artifact.image_storage_ref = target.image_storage_ref.clone();
        artifact.image_prompt = target.image_prompt.clone();
        artifact.status = "regenerated".to_string();
        artifact.updated_at = Utc::now().to_rfc3339();

        self.db.set_artifact(&artifact).await?;

        let fields = VersionFields {
            caption: target.caption,
            image_storage_ref: target.image_storage_ref,
            image_prompt: target.image_prompt,
            feedback: Some(format!("Restored from version {}", version_number)),
            model: None,
            image_model: None,
        };

        let record = self
            .append_version(artifact_id, fields, actions::RESTORE)
            .await?;

        tracing::info!(
            artifact_id,
            restored_from = version_number,
            new_version = record.version_number,
            "Artifact restored"
        );

        Ok(record)
    }

    /// Release the append locks for deleted artifacts.
    ///
    /// Lock entries are created on first append and otherwise live for the
    /// process lifetime; the project cascade calls this so the map's size
    /// stays bounded by the number of live artifacts.
    pub fn forget_artifacts(&self, artifact_ids: &[String]) {
        for artifact_id in artifact_ids {
            self.append_locks.remove(artifact_id);
        }
    }

    /// Snapshot an artifact's current fields into a new version.
    ///
    /// Convenience for callers that just mutated the artifact and need the
    /// matching history entry.
    pub async fn snapshot_current(
        &self,
        artifact: &GeneratedArtifact,
        action: &str,
        feedback: Option<String>,
        model: Option<String>,
        image_model: Option<String>,
    ) -> Result<VersionRecord, AppError> {
        let mut fields = VersionFields::from_artifact(artifact);
        fields.feedback = feedback;
        fields.model = model;
        fields.image_model = image_model;
        self.append_version(&artifact.id, fields, action).await
    }
}
