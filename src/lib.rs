// SPDX-License-Identifier: MIT

//! Postcraft: marketing-content backend API
//!
//! This crate provides the backend API for generating and managing
//! AI-assisted marketing content: projects scoped to their owning user,
//! generated caption+image artifacts with append-only version history,
//! and calendar OAuth integration.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{AccessGuard, AiClient, BlobStore, CalendarOAuthClient, VersioningEngine};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub storage: BlobStore,
    pub guard: AccessGuard,
    pub versioning: VersioningEngine,
    pub ai: AiClient,
    pub calendar_oauth: CalendarOAuthClient,
}
