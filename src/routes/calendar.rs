// SPDX-License-Identifier: MIT

//! Content-calendar routes: scheduling artifacts for publication.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::models::ScheduledPost;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read routes (anonymous callers get empty results).
pub fn read_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/projects/{id}/schedule", get(list_schedule))
}

/// Write routes (require authentication).
pub fn write_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects/{id}/schedule", post(schedule_post))
        .route("/api/scheduled-posts/{id}", delete(unschedule_post))
}

#[derive(Deserialize)]
pub struct SchedulePostRequest {
    pub artifact_id: String,
    /// Publication time (RFC 3339)
    pub scheduled_for: String,
}

#[derive(Serialize)]
pub struct ScheduledPostResponse {
    pub id: String,
    pub artifact_id: String,
    pub scheduled_for: String,
    pub created_at: String,
}

impl From<ScheduledPost> for ScheduledPostResponse {
    fn from(entry: ScheduledPost) -> Self {
        Self {
            id: entry.id,
            artifact_id: entry.artifact_id,
            scheduled_for: entry.scheduled_for,
            created_at: entry.created_at,
        }
    }
}

/// Schedule an artifact for publication.
async fn schedule_post(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<SchedulePostRequest>,
) -> Result<Json<ScheduledPostResponse>> {
    chrono::DateTime::parse_from_rfc3339(&payload.scheduled_for).map_err(|_| {
        AppError::BadRequest("'scheduled_for' must be an RFC 3339 datetime".to_string())
    })?;

    let user = state.guard.require_user(&auth_user).await?;
    state.guard.authorize_project(&user, &project_id).await?;

    // The artifact must belong to the same project; a foreign artifact is
    // indistinguishable from a missing one.
    let (_, artifact) = state
        .guard
        .authorize_artifact(&user, &payload.artifact_id)
        .await?;
    if artifact.project_id != project_id {
        return Err(AppError::NotFound(format!(
            "Artifact {}",
            payload.artifact_id
        )));
    }

    let entry = ScheduledPost {
        id: uuid::Uuid::new_v4().to_string(),
        project_id,
        artifact_id: payload.artifact_id,
        scheduled_for: payload.scheduled_for,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.insert_scheduled_post(&entry).await?;

    tracing::info!(
        entry_id = %entry.id,
        artifact_id = %entry.artifact_id,
        scheduled_for = %entry.scheduled_for,
        "Post scheduled"
    );

    Ok(Json(entry.into()))
}

/// List the calendar for a project, soonest first. Denied reads as empty.
async fn list_schedule(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(caller)): Extension<MaybeAuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<ScheduledPostResponse>>> {
    if state
        .guard
        .authorize_project_read(caller.as_ref(), &project_id)
        .await?
        .is_none()
    {
        return Ok(Json(vec![]));
    }

    let entries = state.db.list_scheduled_posts(&project_id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[derive(Serialize)]
pub struct UnscheduleResponse {
    pub success: bool,
}

/// Remove a calendar entry.
async fn unschedule_post(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<String>,
) -> Result<Json<UnscheduleResponse>> {
    let user = state.guard.require_user(&auth_user).await?;

    let entry = state
        .db
        .get_scheduled_post(&entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Scheduled post {}", entry_id)))?;

    state
        .guard
        .authorize_project(&user, &entry.project_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!("Scheduled post {}", entry_id)),
            other => other,
        })?;

    state.db.delete_scheduled_post(&entry_id).await?;

    Ok(Json(UnscheduleResponse { success: true }))
}
