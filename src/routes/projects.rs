// SPDX-License-Identifier: MIT

//! Project CRUD and source-post routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::models::{Project, ProjectPatch, SourcePost};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Read routes (anonymous callers get empty results).
pub fn read_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/posts", get(list_posts))
}

/// Write routes (require authentication).
pub fn write_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", post(create_project))
        .route(
            "/api/projects/{id}",
            axum::routing::patch(patch_project).delete(delete_project),
        )
        .route("/api/projects/{id}/posts", put(replace_posts))
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub source_profile_url: String,
    pub is_fetching: bool,
    pub profile_bio: Option<String>,
    pub profile_followers: Option<u64>,
    pub profile_post_count: Option<u64>,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            source_profile_url: p.source_profile_url,
            is_fetching: p.is_fetching,
            profile_bio: p.profile_bio,
            profile_followers: p.profile_followers,
            profile_post_count: p.profile_post_count,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SourcePostResponse {
    pub id: String,
    pub caption: String,
    pub image_url: Option<String>,
    pub posted_at: Option<String>,
}

// ─── Create / Update / Delete ────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(url)]
    pub source_profile_url: String,
}

/// Create a project owned by the caller.
async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.guard.require_user(&auth_user).await?;

    let project = Project {
        id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.id.clone(),
        name: payload.name,
        source_profile_url: payload.source_profile_url,
        is_fetching: true,
        profile_bio: None,
        profile_followers: None,
        profile_post_count: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.set_project(&project).await?;

    tracing::info!(
        project_id = %project.id,
        user_id = %user.id,
        "Project created"
    );

    Ok(Json(project.into()))
}

/// Partially update a project (only defined fields are written).
async fn patch_project(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<ProjectResponse>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let user = state.guard.require_user(&auth_user).await?;
    let mut project = state.guard.authorize_project(&user, &project_id).await?;

    patch.apply(&mut project);
    state.db.set_project(&project).await?;

    Ok(Json(project.into()))
}

#[derive(Serialize)]
pub struct DeleteProjectResponse {
    pub success: bool,
    pub deleted_documents: usize,
}

/// Delete a project and cascade to all dependent resources.
async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<DeleteProjectResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_project(&user, &project_id).await?;

    let result = state.db.delete_project_data(&project_id).await?;

    // The deleted artifacts can never be appended to again; release their
    // locks so the map tracks live artifacts only.
    state.versioning.forget_artifacts(&result.artifact_ids);

    // Blob cleanup is best-effort; records are already gone and refs are
    // never reused.
    for storage_ref in &result.storage_refs {
        state.storage.delete(storage_ref).await;
    }

    tracing::info!(
        project_id = %project_id,
        user_id = %user.id,
        deleted = result.deleted_documents,
        "Project deleted"
    );

    Ok(Json(DeleteProjectResponse {
        success: true,
        deleted_documents: result.deleted_documents,
    }))
}

// ─── Reads ───────────────────────────────────────────────────

/// List the caller's projects. Anonymous callers get an empty list.
async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
) -> Result<Json<Vec<ProjectResponse>>> {
    let Some(user) = state.guard.resolve_user(caller.as_ref()).await? else {
        return Ok(Json(vec![]));
    };

    let projects = state.db.list_projects_for_owner(&user.id).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

/// Get one project. Denied or missing both read as null.
async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Option<ProjectResponse>>> {
    let scope = state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?;

    Ok(Json(scope.map(|(_, project)| project.into())))
}

/// List source posts for a project. Denied reads as empty.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<SourcePostResponse>>> {
    if state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let posts = state.db.list_posts_for_project(&project_id).await?;

    Ok(Json(
        posts
            .into_iter()
            .map(|p| SourcePostResponse {
                id: p.id,
                caption: p.caption,
                image_url: p.image_url,
                posted_at: p.posted_at,
            })
            .collect(),
    ))
}

// ─── Replace Posts ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct PostPayload {
    pub caption: String,
    pub image_url: Option<String>,
    pub posted_at: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplacePostsRequest {
    pub posts: Vec<PostPayload>,
}

#[derive(Serialize)]
pub struct ReplacePostsResponse {
    pub success: bool,
    pub count: usize,
}

/// Replace all source posts for a project (delete existing, insert new).
async fn replace_posts(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<ReplacePostsRequest>,
) -> Result<Json<ReplacePostsResponse>> {
    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_project(&user, &project_id).await?;

    let posts: Vec<SourcePost> = payload
        .posts
        .into_iter()
        .map(|p| SourcePost {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.clone(),
            caption: p.caption,
            image_url: p.image_url,
            posted_at: p.posted_at,
        })
        .collect();

    state
        .db
        .replace_posts_for_project(&project_id, &posts)
        .await?;

    Ok(Json(ReplacePostsResponse {
        success: true,
        count: posts.len(),
    }))
}
