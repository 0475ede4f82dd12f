// SPDX-License-Identifier: MIT

//! Project cascade delete integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test
//!
//! The store has no native cascade, so deletion is a deterministic sweep
//! over every dependent collection. The sweep must leave no orphans and
//! must be safe to re-run.

use chrono::Utc;
use postcraft::db::FirestoreDb;
use postcraft::models::{
    actions, ContextImage, Project, ReferenceImage, ScheduledPost, SourcePost, VersionRecord,
};

mod common;
use common::{seed_artifact, seed_project, seed_user, test_db, unique_suffix};

/// Seed one record in every dependent collection of a project.
///
/// Returns the ids needed for post-delete verification.
async fn seed_full_project_tree(db: &FirestoreDb, project: &Project) -> (String, String) {
    let artifact = seed_artifact(db, project, "cascade caption").await;

    let version = VersionRecord {
        id: format!("version-{}", unique_suffix()),
        artifact_id: artifact.id.clone(),
        version_number: 1,
        caption: "cascade caption".to_string(),
        image_storage_ref: Some("images/cascade-version".to_string()),
        image_prompt: None,
        action: actions::CREATE.to_string(),
        feedback: None,
        model: None,
        image_model: None,
        created_at: Utc::now().to_rfc3339(),
    };
    db.insert_version(&version).await.unwrap();

    let posts = vec![SourcePost {
        id: format!("post-{}", unique_suffix()),
        project_id: project.id.clone(),
        caption: "source caption".to_string(),
        image_url: None,
        posted_at: Some(Utc::now().to_rfc3339()),
    }];
    db.replace_posts_for_project(&project.id, &posts).await.unwrap();

    db.insert_reference_image(&ReferenceImage {
        id: format!("ref-{}", unique_suffix()),
        project_id: project.id.clone(),
        storage_ref: "images/cascade-reference".to_string(),
        created_at: Utc::now().to_rfc3339(),
    })
    .await
    .unwrap();

    db.insert_context_image(&ContextImage {
        id: format!("ctx-{}", unique_suffix()),
        project_id: project.id.clone(),
        storage_ref: "images/cascade-context".to_string(),
        label: Some("product shot".to_string()),
        created_at: Utc::now().to_rfc3339(),
    })
    .await
    .unwrap();

    let schedule_id = format!("sched-{}", unique_suffix());
    db.insert_scheduled_post(&ScheduledPost {
        id: schedule_id.clone(),
        project_id: project.id.clone(),
        artifact_id: artifact.id.clone(),
        scheduled_for: Utc::now().to_rfc3339(),
        created_at: Utc::now().to_rfc3339(),
    })
    .await
    .unwrap();

    (artifact.id, schedule_id)
}

#[tokio::test]
async fn test_cascade_delete_leaves_no_orphans() {
    require_emulator!();

    let db = test_db().await;
    let user = seed_user(&db, "cascade").await;
    let project = seed_project(&db, &user, "Doomed").await;
    let (artifact_id, _) = seed_full_project_tree(&db, &project).await;

    let result = db.delete_project_data(&project.id).await.unwrap();

    // artifact + version + post + ref image + ctx image + schedule + project
    assert_eq!(result.deleted_documents, 7);

    // Deleted artifact ids come back so per-artifact state can be released.
    assert_eq!(result.artifact_ids, vec![artifact_id.clone()]);

    // Storage refs from versions and images are collected for blob cleanup.
    assert!(result
        .storage_refs
        .contains(&"images/cascade-version".to_string()));
    assert!(result
        .storage_refs
        .contains(&"images/cascade-reference".to_string()));
    assert!(result
        .storage_refs
        .contains(&"images/cascade-context".to_string()));

    // Nothing reachable through the project remains.
    assert!(db.get_project(&project.id).await.unwrap().is_none());
    assert!(db.get_artifact(&artifact_id).await.unwrap().is_none());
    assert!(db.list_versions(&artifact_id).await.unwrap().is_empty());
    assert!(db.list_posts_for_project(&project.id).await.unwrap().is_empty());
    assert!(db.list_reference_images(&project.id).await.unwrap().is_empty());
    assert!(db.list_context_images(&project.id).await.unwrap().is_empty());
    assert!(db.list_scheduled_posts(&project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cascade_delete_is_rerunnable() {
    require_emulator!();

    let db = test_db().await;
    let user = seed_user(&db, "rerun").await;
    let project = seed_project(&db, &user, "Rerun").await;
    seed_full_project_tree(&db, &project).await;

    db.delete_project_data(&project.id).await.unwrap();

    // A second sweep finds nothing but still succeeds (the project
    // document delete is idempotent).
    let second = db.delete_project_data(&project.id).await.unwrap();
    assert_eq!(second.deleted_documents, 1);
    assert!(second.storage_refs.is_empty());
}

#[tokio::test]
async fn test_cascade_does_not_touch_other_projects() {
    require_emulator!();

    let db = test_db().await;
    let user = seed_user(&db, "isolate").await;
    let victim = seed_project(&db, &user, "Victim").await;
    let survivor = seed_project(&db, &user, "Survivor").await;

    let (_, _) = seed_full_project_tree(&db, &victim).await;
    let (survivor_artifact, _) = seed_full_project_tree(&db, &survivor).await;

    db.delete_project_data(&victim.id).await.unwrap();

    assert!(db.get_project(&survivor.id).await.unwrap().is_some());
    assert!(db.get_artifact(&survivor_artifact).await.unwrap().is_some());
    assert_eq!(db.list_versions(&survivor_artifact).await.unwrap().len(), 1);
    assert_eq!(db.list_reference_images(&survivor.id).await.unwrap().len(), 1);
    assert_eq!(db.list_scheduled_posts(&survivor.id).await.unwrap().len(), 1);
}
