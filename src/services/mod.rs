// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod ai;
pub mod calendar;
pub mod guard;
pub mod storage;
pub mod versioning;

pub use ai::AiClient;
pub use calendar::CalendarOAuthClient;
pub use guard::AccessGuard;
pub use storage::BlobStore;
pub use versioning::{AppendLocks, VersioningEngine};
