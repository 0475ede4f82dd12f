// SPDX-License-Identifier: MIT

//! Generated-artifact routes: generation, regeneration, history, restore.

use crate::error::Result;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::models::{actions, GeneratedArtifact};
use crate::services::ai::build_caption_prompt;
use crate::services::versioning::VersionView;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read routes (anonymous callers get empty results).
pub fn read_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects/{id}/artifacts", get(list_artifacts))
        .route("/api/artifacts/{id}", get(get_artifact))
        .route("/api/artifacts/{id}/history", get(get_history))
        .route("/api/artifacts/{id}/versions/{n}", get(get_version))
}

/// Write routes (require authentication).
pub fn write_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects/{id}/artifacts", post(create_artifact))
        .route("/api/artifacts/{id}/regenerate", post(regenerate_artifact))
        .route("/api/artifacts/{id}/restore/{n}", post(restore_artifact))
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct ArtifactResponse {
    pub id: String,
    pub project_id: String,
    pub caption: String,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub status: String,
    pub updated_at: String,
}

impl ArtifactResponse {
    async fn build(artifact: GeneratedArtifact, state: &AppState) -> Self {
        let image_url = match &artifact.image_storage_ref {
            Some(storage_ref) => state.storage.get_url(storage_ref).await,
            None => None,
        };

        Self {
            id: artifact.id,
            project_id: artifact.project_id,
            caption: artifact.caption,
            image_url,
            image_prompt: artifact.image_prompt,
            status: artifact.status,
            updated_at: artifact.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version_number: u32,
    pub caption: String,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub action: String,
    pub feedback: Option<String>,
    pub model: Option<String>,
    pub image_model: Option<String>,
    pub created_at: String,
}

impl From<VersionView> for VersionResponse {
    fn from(view: VersionView) -> Self {
        Self {
            version_number: view.record.version_number,
            caption: view.record.caption,
            image_url: view.image_url,
            image_prompt: view.record.image_prompt,
            action: view.record.action,
            feedback: view.record.feedback,
            model: view.record.model,
            image_model: view.record.image_model,
            created_at: view.record.created_at,
        }
    }
}

// ─── Generation ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateRequest {
    /// Optional image prompt; when present an image is generated alongside
    /// the caption.
    pub image_prompt: Option<String>,
}

/// Generate a new artifact for a project: caption (and optionally image)
/// via the AI provider, stored as the artifact's current state and
/// mirrored as version 1.
async fn create_artifact(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<ArtifactResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    let project = state.guard.authorize_project(&user, &project_id).await?;

    // Recent source captions anchor the brand voice
    let recent_captions: Vec<String> = state
        .db
        .list_posts_for_project(&project_id)
        .await?
        .into_iter()
        .map(|p| p.caption)
        .collect();

    let prompt = build_caption_prompt(&project, &recent_captions, None);
    let generated = state.ai.generate_caption(&prompt).await?;

    let (image_storage_ref, image_model) = match &payload.image_prompt {
        Some(image_prompt) => {
            let image = state.ai.generate_image(image_prompt).await?;
            let storage_ref = state.storage.store(image.bytes, "image/png").await?;
            (Some(storage_ref), Some(image.model))
        }
        None => (None, None),
    };

    let artifact = GeneratedArtifact {
        id: uuid::Uuid::new_v4().to_string(),
        project_id: project_id.clone(),
        caption: generated.caption,
        image_storage_ref,
        image_prompt: payload.image_prompt,
        status: "generated".to_string(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.set_artifact(&artifact).await?;

    state
        .versioning
        .snapshot_current(
            &artifact,
            actions::CREATE,
            None,
            Some(generated.model),
            image_model,
        )
        .await?;

    tracing::info!(
        artifact_id = %artifact.id,
        project_id = %project_id,
        "Artifact generated"
    );

    Ok(Json(ArtifactResponse::build(artifact, &state).await))
}

#[derive(Deserialize)]
pub struct RegenerateRequest {
    /// User feedback steering the regeneration.
    pub feedback: Option<String>,
    /// When true and the artifact has an image prompt, the image is
    /// regenerated too.
    #[serde(default)]
    pub regenerate_image: bool,
}

/// Regenerate an artifact's content, recording the previous state's
/// successor as a new version.
async fn regenerate_artifact(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(artifact_id): Path<String>,
    Json(payload): Json<RegenerateRequest>,
) -> Result<Json<ArtifactResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    let (project, mut artifact) = state.guard.authorize_artifact(&user, &artifact_id).await?;

    let recent_captions: Vec<String> = state
        .db
        .list_posts_for_project(&project.id)
        .await?
        .into_iter()
        .map(|p| p.caption)
        .collect();

    let prompt = build_caption_prompt(&project, &recent_captions, payload.feedback.as_deref());
    let generated = state.ai.generate_caption(&prompt).await?;

    let mut image_model = None;
    if payload.regenerate_image {
        if let Some(image_prompt) = artifact.image_prompt.clone() {
            let image = state.ai.generate_image(&image_prompt).await?;
            let storage_ref = state.storage.store(image.bytes, "image/png").await?;
            artifact.image_storage_ref = Some(storage_ref);
            image_model = Some(image.model);
        }
    }

    artifact.caption = generated.caption;
    artifact.status = "generated".to_string();
    artifact.updated_at = chrono::Utc::now().to_rfc3339();

    state.db.set_artifact(&artifact).await?;

    state
        .versioning
        .snapshot_current(
            &artifact,
            actions::REGENERATE,
            payload.feedback,
            Some(generated.model),
            image_model,
        )
        .await?;

    Ok(Json(ArtifactResponse::build(artifact, &state).await))
}

// ─── History & Restore ───────────────────────────────────────

#[derive(Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub new_version: u32,
}

/// Restore an artifact to a prior version. The restore itself is recorded
/// as a new version; earlier history is never rewritten.
async fn restore_artifact(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path((artifact_id, version_number)): Path<(String, u32)>,
) -> Result<Json<RestoreResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_artifact(&user, &artifact_id).await?;

    let record = state.versioning.restore(&artifact_id, version_number).await?;

    Ok(Json(RestoreResponse {
        success: true,
        new_version: record.version_number,
    }))
}

// ─── Reads ───────────────────────────────────────────────────

/// List a project's artifacts. Denied reads as empty.
async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<ArtifactResponse>>> {
    if state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let artifacts = state.db.list_artifacts_for_project(&project_id).await?;

    let mut responses = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        responses.push(ArtifactResponse::build(artifact, &state).await);
    }

    Ok(Json(responses))
}

/// Get one artifact. Denied or missing both read as null.
async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(artifact_id): Path<String>,
) -> Result<Json<Option<ArtifactResponse>>> {
    let Some((_, _, artifact)) = state
        .guard
        .authorize_artifact_read(caller.as_ref(), &artifact_id)
        .await?
    else {
        return Ok(Json(None));
    };

    Ok(Json(Some(ArtifactResponse::build(artifact, &state).await)))
}

/// Version history, newest first. Denied reads as empty.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(artifact_id): Path<String>,
) -> Result<Json<Vec<VersionResponse>>> {
    if state
        .guard
        .authorize_artifact_read(caller.as_ref(), &artifact_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let history = state.versioning.history(&artifact_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

/// Exact version lookup. Denied reads as null; an authorized caller asking
/// for an absent version gets an explicit 404.
async fn get_version(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path((artifact_id, version_number)): Path<(String, u32)>,
) -> Result<Json<Option<VersionResponse>>> {
    if state
        .guard
        .authorize_artifact_read(caller.as_ref(), &artifact_id)
        .await?
        .is_none()
    {
        return Ok(Json(None));
    }

    let record = state.versioning.version(&artifact_id, version_number).await?;
    let image_url = match &record.image_storage_ref {
        Some(storage_ref) => state.storage.get_url(storage_ref).await,
        None => None,
    };

    Ok(Json(Some(VersionResponse::from(VersionView {
        record,
        image_url,
    }))))
}
