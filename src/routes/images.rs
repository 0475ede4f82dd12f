// SPDX-License-Identifier: MIT

//! Reference and context image routes.
//!
//! Image bytes go straight to the blob store; records only carry the
//! opaque storage reference, resolved to a URL on every read.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::models::{ContextImage, ReferenceImage};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read routes (anonymous callers get empty results).
pub fn read_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/projects/{id}/reference-images",
            get(list_reference_images),
        )
        .route("/api/projects/{id}/context-images", get(list_context_images))
}

/// Write routes (require authentication).
pub fn write_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/projects/{id}/reference-images",
            post(upload_reference_image),
        )
        .route(
            "/api/reference-images/{id}",
            delete(delete_reference_image),
        )
        .route(
            "/api/projects/{id}/context-images",
            post(upload_context_image),
        )
}

// ─── Payloads & Responses ────────────────────────────────────

#[derive(Deserialize)]
pub struct UploadImageRequest {
    /// Base64-encoded image bytes
    pub image_b64: String,
    /// MIME type of the upload
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Label (context images only)
    pub label: Option<String>,
}

fn default_content_type() -> String {
    "image/png".to_string()
}

#[derive(Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub image_url: Option<String>,
    pub label: Option<String>,
    pub created_at: String,
}

fn decode_image(payload: &UploadImageRequest) -> Result<Vec<u8>> {
    STANDARD
        .decode(&payload.image_b64)
        .map_err(|_| AppError::BadRequest("Invalid base64 image payload".to_string()))
}

// ─── Reference Images ────────────────────────────────────────

/// Upload a reference image to a project.
async fn upload_reference_image(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<UploadImageRequest>,
) -> Result<Json<ImageResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_project(&user, &project_id).await?;

    let bytes = decode_image(&payload)?;
    let storage_ref = state.storage.store(bytes, &payload.content_type).await?;

    let image = ReferenceImage {
        id: uuid::Uuid::new_v4().to_string(),
        project_id,
        storage_ref,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.insert_reference_image(&image).await?;

    let image_url = state.storage.get_url(&image.storage_ref).await;
    Ok(Json(ImageResponse {
        id: image.id,
        image_url,
        label: None,
        created_at: image.created_at,
    }))
}

/// List a project's reference images. Denied reads as empty.
async fn list_reference_images(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<ImageResponse>>> {
    if state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let images = state.db.list_reference_images(&project_id).await?;

    let mut responses = Vec::with_capacity(images.len());
    for image in images {
        let image_url = state.storage.get_url(&image.storage_ref).await;
        responses.push(ImageResponse {
            id: image.id,
            image_url,
            label: None,
            created_at: image.created_at,
        });
    }

    Ok(Json(responses))
}

#[derive(Serialize)]
pub struct DeleteImageResponse {
    pub success: bool,
}

/// Delete a reference image record and its blob.
async fn delete_reference_image(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(image_id): Path<String>,
) -> Result<Json<DeleteImageResponse>> {
    let user = state.guard.require_user(&auth_user).await?;

    let image = state
        .db
        .get_reference_image(&image_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reference image {}", image_id)))?;

    // Walk the back-reference to the owning project; a foreign image reads
    // the same as a missing one.
    state
        .guard
        .authorize_project(&user, &image.project_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!("Reference image {}", image_id)),
            other => other,
        })?;

    state.db.delete_reference_image(&image_id).await?;
    state.storage.delete(&image.storage_ref).await;

    Ok(Json(DeleteImageResponse { success: true }))
}

// ─── Context Images ──────────────────────────────────────────

/// Upload a context image (product shot, brand asset) to a project.
async fn upload_context_image(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<UploadImageRequest>,
) -> Result<Json<ImageResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_project(&user, &project_id).await?;

    let bytes = decode_image(&payload)?;
    let storage_ref = state.storage.store(bytes, &payload.content_type).await?;

    let image = ContextImage {
        id: uuid::Uuid::new_v4().to_string(),
        project_id,
        storage_ref,
        label: payload.label,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.insert_context_image(&image).await?;

    let image_url = state.storage.get_url(&image.storage_ref).await;
    Ok(Json(ImageResponse {
        id: image.id,
        image_url,
        label: image.label,
        created_at: image.created_at,
    }))
}

/// List a project's context images. Denied reads as empty.
async fn list_context_images(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<ImageResponse>>> {
    if state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let images = state.db.list_context_images(&project_id).await?;

    let mut responses = Vec::with_capacity(images.len());
    for image in images {
        let image_url = state.storage.get_url(&image.storage_ref).await;
        responses.push(ImageResponse {
            id: image.id,
            image_url,
            label: image.label,
            created_at: image.created_at,
        });
    }

    Ok(Json(responses))
}
