// SPDX-License-Identifier: MIT

//! Ownership-scoped access guard.
//!
//! Every data operation goes through the same policy: resolve the caller's
//! internal user record, walk the target's back-reference chain to its root
//! project, and compare the project owner to the caller. The check is pure
//! and re-applied per operation — never cached on a session, since project
//! ownership can change between requests.
//!
//! Denial semantics differ by operation class:
//! - Writes fail loud: missing caller record is `Unauthorized`; a missing or
//!   foreign resource is `NotFound`. The two denial shapes for resources are
//!   intentionally indistinguishable so existence never leaks.
//! - Reads fail closed: the `*_read` methods return `None` for any denial,
//!   and handlers degrade to empty results instead of surfacing an error.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{GeneratedArtifact, Project, User};

/// Authorization component shared by every route handler.
#[derive(Clone)]
pub struct AccessGuard {
    db: FirestoreDb,
}

impl AccessGuard {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    // ─── Caller Resolution ───────────────────────────────────────

    /// Resolve the caller's internal user record, for write operations.
    ///
    /// An authenticated subject with no user record is a hard failure here;
    /// user records are created at session issuance, so this only happens
    /// for deleted accounts or forged subjects.
    pub async fn require_user(&self, caller: &AuthUser) -> Result<User, AppError> {
        self.db
            .get_user_by_subject(&caller.subject)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Resolve the caller's internal user record, for read operations.
    ///
    /// Anonymous callers and unknown subjects both resolve to `None`.
    pub async fn resolve_user(
        &self,
        caller: Option<&AuthUser>,
    ) -> Result<Option<User>, AppError> {
        match caller {
            Some(auth) => self.db.get_user_by_subject(&auth.subject).await,
            None => Ok(None),
        }
    }

    // ─── Write Authorization (fail loud) ─────────────────────────

    /// Authorize a write against a project.
    ///
    /// Missing project and foreign project both return the same `NotFound`.
    pub async fn authorize_project(
        &self,
        user: &User,
        project_id: &str,
    ) -> Result<Project, AppError> {
        let project = self
            .db
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))?;

        if project.owner_user_id != user.id {
            tracing::debug!(
                user_id = %user.id,
                project_id,
                "Ownership check failed"
            );
            return Err(AppError::NotFound(format!("Project {}", project_id)));
        }

        Ok(project)
    }

    /// Authorize a write against an artifact (one extra back-reference hop:
    /// artifact → project).
    pub async fn authorize_artifact(
        &self,
        user: &User,
        artifact_id: &str,
    ) -> Result<(Project, GeneratedArtifact), AppError> {
        let artifact = self
            .db
            .get_artifact(artifact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artifact {}", artifact_id)))?;

        // A broken back-reference chain is also "not found".
        let project = self
            .authorize_project(user, &artifact.project_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(format!("Artifact {}", artifact_id)),
                other => other,
            })?;

        Ok((project, artifact))
    }

    // ─── Read Authorization (fail closed) ────────────────────────

    /// Authorize a read against a project; `None` for any denial.
    pub async fn authorize_project_read(
        &self,
        caller: Option<&AuthUser>,
        project_id: &str,
    ) -> Result<Option<(User, Project)>, AppError> {
        let Some(user) = self.resolve_user(caller).await? else {
            return Ok(None);
        };

        let Some(project) = self.db.get_project(project_id).await? else {
            return Ok(None);
        };

        if project.owner_user_id != user.id {
            return Ok(None);
        }

        Ok(Some((user, project)))
    }

    /// Authorize a read against an artifact; `None` for any denial.
    pub async fn authorize_artifact_read(
        &self,
        caller: Option<&AuthUser>,
        artifact_id: &str,
    ) -> Result<Option<(User, Project, GeneratedArtifact)>, AppError> {
        let Some(user) = self.resolve_user(caller).await? else {
            return Ok(None);
        };

        let Some(artifact) = self.db.get_artifact(artifact_id).await? else {
            return Ok(None);
        };

        let Some(project) = self.db.get_project(&artifact.project_id).await? else {
            return Ok(None);
        };

        if project.owner_user_id != user.id {
            return Ok(None);
        }

        Ok(Some((user, project, artifact)))
    }
}
