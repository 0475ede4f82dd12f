// SPDX-License-Identifier: MIT

//! Postcraft API Server
//!
//! Backend for the marketing-content studio: project management,
//! AI caption/image generation with versioned history, and calendar
//! integration.

use postcraft::{
    config::Config,
    db::FirestoreDb,
    services::{AccessGuard, AiClient, BlobStore, CalendarOAuthClient, VersioningEngine},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Postcraft API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Blob store for generated and uploaded images
    let storage = BlobStore::new(config.storage_bucket.clone());
    tracing::info!(bucket = %config.storage_bucket, "Blob store initialized");

    // Per-artifact append locks, shared across all engine clones in this
    // instance
    let append_locks = std::sync::Arc::new(dashmap::DashMap::new());

    let guard = AccessGuard::new(db.clone());
    let versioning = VersioningEngine::new(db.clone(), storage.clone(), append_locks);

    let ai = AiClient::new(config.ai_api_url.clone(), config.ai_api_key.clone());
    tracing::info!(api_url = %config.ai_api_url, "AI client initialized");

    let calendar_oauth = CalendarOAuthClient::new(
        config.calendar_client_id.clone(),
        config.calendar_client_secret.clone(),
        config.calendar_token_url.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        storage,
        guard,
        versioning,
        ai,
        calendar_oauth,
    });

    // Build router
    let app = postcraft::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("postcraft=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
