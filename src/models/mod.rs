// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod artifact;
pub mod calendar;
pub mod project;
pub mod user;

pub use artifact::{actions, GeneratedArtifact, VersionFields, VersionRecord};
pub use calendar::CalendarTokens;
pub use project::{ContextImage, Project, ProjectPatch, ReferenceImage, ScheduledPost, SourcePost};
pub use user::User;
