// SPDX-License-Identifier: MIT

//! Blob store client.
//!
//! Records never embed binary payloads; they hold an opaque storage
//! reference. URLs are resolved from the reference at read time and never
//! persisted, so a change to the store's URL scheme never strands records.
//! Deletion is delete-then-forget: there is no reference counting.

use crate::error::AppError;
use uuid::Uuid;

const STORAGE_API_BASE: &str = "https://storage.googleapis.com";

/// Blob store client over the bucket HTTP API.
#[derive(Clone)]
pub struct BlobStore {
    http: Option<reqwest::Client>,
    bucket: String,
}

impl BlobStore {
    pub fn new(bucket: String) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            bucket,
        }
    }

    /// Create a mock blob store for testing (offline mode).
    ///
    /// `store` and `delete` succeed without I/O; `get_url` still resolves
    /// deterministic URLs so read paths are exercised.
    pub fn new_mock(bucket: String) -> Self {
        Self { http: None, bucket }
    }

    /// Upload bytes and return an opaque storage reference.
    pub async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let storage_ref = format!("images/{}", Uuid::new_v4());

        let Some(http) = &self.http else {
            // Offline mode: pretend the upload happened.
            return Ok(storage_ref);
        };

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            STORAGE_API_BASE,
            self.bucket,
            urlencoding::encode(&storage_ref)
        );

        let response = http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Blob upload failed: HTTP {}: {}",
                status, body
            )));
        }

        tracing::debug!(storage_ref = %storage_ref, "Blob stored");
        Ok(storage_ref)
    }

    /// Resolve a storage reference to a fetchable URL.
    ///
    /// Resolution is lazy and deterministic; empty references resolve to
    /// `None`.
    pub async fn get_url(&self, storage_ref: &str) -> Option<String> {
        if storage_ref.is_empty() {
            return None;
        }

        Some(format!(
            "{}/{}/{}",
            STORAGE_API_BASE, self.bucket, storage_ref
        ))
    }

    /// Delete a blob, best-effort. A failure is logged and swallowed; the
    /// sweep that triggered it is idempotent and can be re-run.
    pub async fn delete(&self, storage_ref: &str) {
        let Some(http) = &self.http else {
            return;
        };

        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            STORAGE_API_BASE,
            self.bucket,
            urlencoding::encode(storage_ref)
        );

        match http.delete(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(storage_ref, "Blob deleted");
            }
            Ok(response) => {
                tracing::warn!(
                    storage_ref,
                    status = %response.status(),
                    "Blob delete failed"
                );
            }
            Err(e) => {
                tracing::warn!(storage_ref, error = %e, "Blob delete request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_returns_opaque_ref() {
        let storage = BlobStore::new_mock("test-bucket".to_string());
        let storage_ref = storage.store(vec![1, 2, 3], "image/png").await.unwrap();

        assert!(storage_ref.starts_with("images/"));
        // Refs are opaque handles, not URLs
        assert!(!storage_ref.contains("://"));
    }

    #[tokio::test]
    async fn test_get_url_resolves_lazily() {
        let storage = BlobStore::new_mock("test-bucket".to_string());

        let url = storage.get_url("images/abc").await.unwrap();
        assert!(url.contains("test-bucket"));
        assert!(url.ends_with("images/abc"));

        assert!(storage.get_url("").await.is_none());
    }
}
