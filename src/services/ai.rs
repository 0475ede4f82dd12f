// SPDX-License-Identifier: MIT

//! AI provider client for caption and image generation.
//!
//! The provider is an opaque HTTP service: send a structured prompt,
//! receive generated text or image bytes, or one of the failure classes
//! {RateLimit, MalformedResponse, Network, Provider}. Raw error bodies are
//! logged and never surfaced to end users.

use crate::error::AppError;
use crate::models::Project;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const TEXT_MODEL: &str = "gpt-4o-mini";
const IMAGE_MODEL: &str = "gpt-image-1";

/// AI provider HTTP client.
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Request body for text generation.
#[derive(Serialize)]
struct TextRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

/// Request body for image generation.
#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    image_b64: String,
}

/// A generated caption plus the model that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedCaption {
    pub caption: String,
    pub model: String,
}

/// Generated image bytes plus the model that produced them.
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub model: String,
}

impl AiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn require_api_key(&self) -> Result<(), AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Configuration("AI_API_KEY"));
        }
        Ok(())
    }

    /// Generate a caption for the given prompt.
    pub async fn generate_caption(&self, prompt: &str) -> Result<GeneratedCaption, AppError> {
        self.require_api_key()?;

        let url = format!("{}/generate/text", self.base_url);
        let body = TextRequest {
            model: TEXT_MODEL,
            prompt,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let parsed: TextResponse = self.check_response_json(response).await?;

        Ok(GeneratedCaption {
            caption: parsed.text,
            model: TEXT_MODEL.to_string(),
        })
    }

    /// Generate an image for the given prompt. Returns raw bytes; the
    /// caller is responsible for storing them in the blob store.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AppError> {
        self.require_api_key()?;

        let url = format!("{}/generate/image", self.base_url);
        let body = ImageRequest {
            model: IMAGE_MODEL,
            prompt,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let parsed: ImageResponse = self.check_response_json(response).await?;

        let bytes = STANDARD
            .decode(&parsed.image_b64)
            .map_err(|e| AppError::MalformedResponse(format!("Invalid image payload: {}", e)))?;

        Ok(GeneratedImage {
            bytes,
            model: IMAGE_MODEL.to_string(),
        })
    }

    /// Check response status and parse the JSON body, mapping failures to
    /// the error taxonomy.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.as_u16() == 429 {
            tracing::warn!("AI provider rate limit hit (429)");
            return Err(AppError::RateLimit);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(e.to_string()))
    }
}

/// Build a caption-generation prompt from a project's profile context.
///
/// Pure function so prompt assembly is testable without the provider.
pub fn build_caption_prompt(
    project: &Project,
    recent_captions: &[String],
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Write an Instagram caption for the brand at {}.",
        project.source_profile_url
    );

    if let Some(bio) = &project.profile_bio {
        prompt.push_str(&format!(" Brand bio: {}.", bio));
    }

    if !recent_captions.is_empty() {
        prompt.push_str(" Match the voice of these recent captions: ");
        for caption in recent_captions.iter().take(5) {
            prompt.push_str(&format!("\"{}\" ", caption));
        }
    }

    if let Some(feedback) = feedback {
        prompt.push_str(&format!(" Apply this feedback: {}.", feedback));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: "p1".to_string(),
            owner_user_id: "u1".to_string(),
            name: "Acme".to_string(),
            source_profile_url: "https://instagram.com/acme".to_string(),
            is_fetching: false,
            profile_bio: Some("Small-batch coffee".to_string()),
            profile_followers: None,
            profile_post_count: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let client = AiClient::new("http://localhost:9999/v1".to_string(), String::new());

        let result = client.generate_caption("anything").await;
        assert!(matches!(result, Err(AppError::Configuration("AI_API_KEY"))));

        let result = client.generate_image("anything").await;
        assert!(matches!(result, Err(AppError::Configuration("AI_API_KEY"))));
    }

    #[test]
    fn test_prompt_includes_profile_context() {
        let prompt = build_caption_prompt(&sample_project(), &[], None);
        assert!(prompt.contains("instagram.com/acme"));
        assert!(prompt.contains("Small-batch coffee"));
    }

    #[test]
    fn test_prompt_includes_feedback_and_caps_captions() {
        let captions: Vec<String> = (0..10).map(|i| format!("caption {}", i)).collect();
        let prompt = build_caption_prompt(&sample_project(), &captions, Some("more playful"));

        assert!(prompt.contains("more playful"));
        assert!(prompt.contains("caption 4"));
        // Only the five most recent captions are included
        assert!(!prompt.contains("caption 5"));
    }
}
