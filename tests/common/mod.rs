// SPDX-License-Identifier: MIT

use postcraft::config::Config;
use postcraft::db::FirestoreDb;
use postcraft::models::{GeneratedArtifact, Project, User};
use postcraft::routes::create_router;
use postcraft::services::{AccessGuard, AiClient, BlobStore, CalendarOAuthClient, VersioningEngine};
use postcraft::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let state = build_state(config, db);
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db().await;
    let state = build_state(config, db);
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
fn build_state(config: Config, db: FirestoreDb) -> Arc<AppState> {
    let storage = BlobStore::new_mock(config.storage_bucket.clone());
    let append_locks = Arc::new(dashmap::DashMap::new());

    let guard = AccessGuard::new(db.clone());
    let versioning = VersioningEngine::new(db.clone(), storage.clone(), append_locks);
    let ai = AiClient::new(config.ai_api_url.clone(), config.ai_api_key.clone());
    let calendar_oauth = CalendarOAuthClient::new(
        config.calendar_client_id.clone(),
        config.calendar_client_secret.clone(),
        config.calendar_token_url.clone(),
    );

    Arc::new(AppState {
        config,
        db,
        storage,
        guard,
        versioning,
        ai,
        calendar_oauth,
    })
}

/// Generate a unique suffix for test isolation.
#[allow(dead_code)]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Seed a user owned by a unique identity subject.
#[allow(dead_code)]
pub async fn seed_user(db: &FirestoreDb, tag: &str) -> User {
    let suffix = unique_suffix();
    let user = User {
        id: format!("user-{}-{}", tag, suffix),
        identity_subject: format!("identity|{}-{}", tag, suffix),
        name: format!("Test {}", tag),
        email: Some(format!("{}@example.com", tag)),
        image_url: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    db.upsert_user(&user).await.expect("seed user");
    user
}

/// Seed a project owned by the given user.
#[allow(dead_code)]
pub async fn seed_project(db: &FirestoreDb, owner: &User, name: &str) -> Project {
    let project = Project {
        id: format!("project-{}", unique_suffix()),
        owner_user_id: owner.id.clone(),
        name: name.to_string(),
        source_profile_url: "https://instagram.com/acme".to_string(),
        is_fetching: false,
        profile_bio: Some("Test brand".to_string()),
        profile_followers: Some(100),
        profile_post_count: Some(10),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    db.set_project(&project).await.expect("seed project");
    project
}

/// Seed an artifact in the given project.
#[allow(dead_code)]
pub async fn seed_artifact(db: &FirestoreDb, project: &Project, caption: &str) -> GeneratedArtifact {
    let artifact = GeneratedArtifact {
        id: format!("artifact-{}", unique_suffix()),
        project_id: project.id.clone(),
        caption: caption.to_string(),
        image_storage_ref: None,
        image_prompt: None,
        status: "draft".to_string(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    };
    db.set_artifact(&artifact).await.expect("seed artifact");
    artifact
}
