// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (keyed by internal id, indexed by identity subject)
//! - Projects (indexed by owner)
//! - Owned resources (posts, images, schedule entries, artifacts — all
//!   indexed by owning project id)
//! - Artifact versions (composite index artifact_id + version_number)
//! - Calendar tokens (keyed by user id)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    CalendarTokens, ContextImage, GeneratedArtifact, Project, ReferenceImage, ScheduledPost,
    SourcePost, User, VersionRecord,
};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Outcome of a project cascade delete.
pub struct CascadeResult {
    /// Number of documents removed across all collections.
    pub deleted_documents: usize,
    /// Blob references collected from image-bearing records, for
    /// best-effort blob cleanup by the caller.
    pub storage_refs: Vec<String>,
    /// Ids of the deleted artifacts, so the caller can release any
    /// per-artifact state (append locks) held for them.
    pub artifact_ids: Vec<String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // ExternalJwtFunctionSource provides a dummy token without needing a
        // custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by internal ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by identity-provider subject.
    pub async fn get_user_by_subject(&self, subject: &str) -> Result<Option<User>, AppError> {
        let subject = subject.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("identity_subject").eq(subject.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Project Operations ──────────────────────────────────────

    /// Get a project by ID.
    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROJECTS)
            .obj()
            .one(project_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List projects owned by a user, newest first.
    pub async fn list_projects_for_owner(
        &self,
        owner_user_id: &str,
    ) -> Result<Vec<Project>, AppError> {
        let owner = owner_user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROJECTS)
            .filter(move |q| q.field("owner_user_id").eq(owner.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite a project document.
    pub async fn set_project(&self, project: &Project) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROJECTS)
            .document_id(&project.id)
            .object(project)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Source Post Operations ──────────────────────────────────

    /// List source posts for a project, newest first.
    pub async fn list_posts_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<SourcePost>, AppError> {
        self.list_by_project(collections::SOURCE_POSTS, project_id, Some("posted_at"))
            .await
    }

    /// Replace all source posts for a project.
    ///
    /// Deletes the existing set, then inserts the new posts sequentially.
    /// Each delete/insert is atomic per document; there is no multi-document
    /// atomicity across the whole replace, so a crash mid-replace can leave
    /// a partial result. Re-running the replace converges.
    pub async fn replace_posts_for_project(
        &self,
        project_id: &str,
        posts: &[SourcePost],
    ) -> Result<(), AppError> {
        let existing = self.list_posts_for_project(project_id).await?;
        self.batch_delete(&existing, collections::SOURCE_POSTS, |p: &SourcePost| {
            p.id.clone()
        })
        .await?;

        let client = self.get_client()?;
        for post in posts {
            let _: () = client
                .fluent()
                .update()
                .in_col(collections::SOURCE_POSTS)
                .document_id(&post.id)
                .object(post)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tracing::debug!(
            project_id,
            removed = existing.len(),
            inserted = posts.len(),
            "Replaced source posts"
        );
        Ok(())
    }

    // ─── Reference / Context Image Operations ────────────────────

    /// Store a reference image record.
    pub async fn insert_reference_image(&self, image: &ReferenceImage) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFERENCE_IMAGES)
            .document_id(&image.id)
            .object(image)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a reference image record by ID.
    pub async fn get_reference_image(
        &self,
        image_id: &str,
    ) -> Result<Option<ReferenceImage>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFERENCE_IMAGES)
            .obj()
            .one(image_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reference images for a project, newest first.
    pub async fn list_reference_images(
        &self,
        project_id: &str,
    ) -> Result<Vec<ReferenceImage>, AppError> {
        self.list_by_project(collections::REFERENCE_IMAGES, project_id, Some("created_at"))
            .await
    }

    /// Delete a reference image record.
    pub async fn delete_reference_image(&self, image_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REFERENCE_IMAGES)
            .document_id(image_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store a context image record.
    pub async fn insert_context_image(&self, image: &ContextImage) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONTEXT_IMAGES)
            .document_id(&image.id)
            .object(image)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List context images for a project, newest first.
    pub async fn list_context_images(
        &self,
        project_id: &str,
    ) -> Result<Vec<ContextImage>, AppError> {
        self.list_by_project(collections::CONTEXT_IMAGES, project_id, Some("created_at"))
            .await
    }

    // ─── Scheduled Post Operations ───────────────────────────────

    /// Store a calendar entry.
    pub async fn insert_scheduled_post(&self, entry: &ScheduledPost) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SCHEDULED_POSTS)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a calendar entry by ID.
    pub async fn get_scheduled_post(
        &self,
        entry_id: &str,
    ) -> Result<Option<ScheduledPost>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SCHEDULED_POSTS)
            .obj()
            .one(entry_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List calendar entries for a project, soonest first.
    pub async fn list_scheduled_posts(
        &self,
        project_id: &str,
    ) -> Result<Vec<ScheduledPost>, AppError> {
        let project_id = project_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCHEDULED_POSTS)
            .filter(move |q| q.field("project_id").eq(project_id.clone()))
            .order_by([(
                "scheduled_for",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a calendar entry.
    pub async fn delete_scheduled_post(&self, entry_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SCHEDULED_POSTS)
            .document_id(entry_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Artifact Operations ─────────────────────────────────────

    /// Get an artifact by ID.
    pub async fn get_artifact(
        &self,
        artifact_id: &str,
    ) -> Result<Option<GeneratedArtifact>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ARTIFACTS)
            .obj()
            .one(artifact_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List artifacts for a project, most recently updated first.
    pub async fn list_artifacts_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<GeneratedArtifact>, AppError> {
        self.list_by_project(collections::ARTIFACTS, project_id, Some("updated_at"))
            .await
    }

    /// Create or overwrite an artifact document.
    pub async fn set_artifact(&self, artifact: &GeneratedArtifact) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ARTIFACTS)
            .document_id(&artifact.id)
            .object(artifact)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Version Operations ──────────────────────────────────────

    /// Insert an immutable version record.
    pub async fn insert_version(&self, version: &VersionRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ARTIFACT_VERSIONS)
            .document_id(&version.id)
            .object(version)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count existing versions for an artifact.
    pub async fn count_versions(&self, artifact_id: &str) -> Result<u32, AppError> {
        // The fluent API has no aggregate count; histories are short (one
        // record per edit), so fetching and counting is acceptable here.
        let versions = self.list_versions(artifact_id).await?;
        Ok(versions.len() as u32)
    }

    /// List all versions for an artifact, newest first.
    pub async fn list_versions(&self, artifact_id: &str) -> Result<Vec<VersionRecord>, AppError> {
        let artifact_id = artifact_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ARTIFACT_VERSIONS)
            .filter(move |q| q.field("artifact_id").eq(artifact_id.clone()))
            .order_by([(
                "version_number",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Exact-match lookup on the composite (artifact_id, version_number) key.
    pub async fn get_version(
        &self,
        artifact_id: &str,
        version_number: u32,
    ) -> Result<Option<VersionRecord>, AppError> {
        let artifact_id = artifact_id.to_string();
        let mut versions: Vec<VersionRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ARTIFACT_VERSIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("artifact_id").eq(artifact_id.clone()),
                    q.field("version_number").eq(version_number),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(versions.pop())
    }

    // ─── Calendar Token Operations ───────────────────────────────

    /// Store calendar OAuth tokens for a user.
    pub async fn set_calendar_tokens(
        &self,
        user_id: &str,
        tokens: &CalendarTokens,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CALENDAR_TOKENS)
            .document_id(user_id)
            .object(tokens)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get calendar OAuth tokens for a user.
    pub async fn get_calendar_tokens(
        &self,
        user_id: &str,
    ) -> Result<Option<CalendarTokens>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CALENDAR_TOKENS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Generic "owned resources by project id" query.
    async fn list_by_project<T: for<'de> serde::Deserialize<'de> + Send>(
        &self,
        collection: &str,
        project_id: &str,
        order_desc_by: Option<&str>,
    ) -> Result<Vec<T>, AppError> {
        let project_id = project_id.to_string();
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.field("project_id").eq(project_id.clone()));

        let query = if let Some(field) = order_desc_by {
            query.order_by([(field, firestore::FirestoreQueryDirection::Descending)])
        } else {
            query
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── Project Cascade Delete ────────────────────────────────────

    /// Delete a project and everything reachable through it.
    ///
    /// The store has no native foreign-key cascade, so this enumerates every
    /// dependent collection in a deterministic order. Each delete-by-id is
    /// idempotent; a failure partway is recovered by re-running the sweep.
    ///
    /// Order: artifact versions → artifacts → source posts → reference
    /// images → context images → scheduled posts → project document.
    pub async fn delete_project_data(&self, project_id: &str) -> Result<CascadeResult, AppError> {
        let mut deleted_count = 0;
        let mut storage_refs: Vec<String> = Vec::new();

        // 1. Artifact versions (one extra hop: versions reference artifacts)
        let artifacts = self.list_artifacts_for_project(project_id).await?;
        for artifact in &artifacts {
            let versions = self.list_versions(&artifact.id).await?;
            storage_refs.extend(
                versions
                    .iter()
                    .filter_map(|v| v.image_storage_ref.clone()),
            );
            deleted_count += versions.len();
            self.batch_delete(
                &versions,
                collections::ARTIFACT_VERSIONS,
                |v: &VersionRecord| v.id.clone(),
            )
            .await?;
        }
        tracing::debug!(project_id, count = artifacts.len(), "Deleted version history");

        // 2. Artifacts
        storage_refs.extend(
            artifacts
                .iter()
                .filter_map(|a| a.image_storage_ref.clone()),
        );
        deleted_count += artifacts.len();
        self.batch_delete(&artifacts, collections::ARTIFACTS, |a: &GeneratedArtifact| {
            a.id.clone()
        })
        .await?;

        // 3. Source posts
        let posts = self.list_posts_for_project(project_id).await?;
        deleted_count += posts.len();
        self.batch_delete(&posts, collections::SOURCE_POSTS, |p: &SourcePost| {
            p.id.clone()
        })
        .await?;

        // 4. Reference images
        let reference_images = self.list_reference_images(project_id).await?;
        storage_refs.extend(reference_images.iter().map(|i| i.storage_ref.clone()));
        deleted_count += reference_images.len();
        self.batch_delete(
            &reference_images,
            collections::REFERENCE_IMAGES,
            |i: &ReferenceImage| i.id.clone(),
        )
        .await?;

        // 5. Context images
        let context_images = self.list_context_images(project_id).await?;
        storage_refs.extend(context_images.iter().map(|i| i.storage_ref.clone()));
        deleted_count += context_images.len();
        self.batch_delete(
            &context_images,
            collections::CONTEXT_IMAGES,
            |i: &ContextImage| i.id.clone(),
        )
        .await?;

        // 6. Scheduled posts
        let scheduled = self.list_scheduled_posts(project_id).await?;
        deleted_count += scheduled.len();
        self.batch_delete(
            &scheduled,
            collections::SCHEDULED_POSTS,
            |s: &ScheduledPost| s.id.clone(),
        )
        .await?;

        // 7. The project document itself, last, so a failed sweep leaves the
        //    project visible and re-deletable.
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PROJECTS)
            .document_id(project_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(project_id, deleted_count, "Project cascade delete complete");

        Ok(CascadeResult {
            deleted_documents: deleted_count,
            storage_refs,
            artifact_ids: artifacts.into_iter().map(|a| a.id).collect(),
        })
    }
}
