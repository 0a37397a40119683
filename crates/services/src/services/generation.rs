use async_trait::async_trait;
use db::models::post::{ImageEngine, PostCategory};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::services::config::GenerationConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generation API returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Generation API returned no image url")]
    MissingImage,
}

/// Everything the upstream content/image pipeline needs to produce a draft.
/// For regenerations, `feedback` plus the previous title/description steer
/// the new output.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub agent_handle: String,
    pub persona: Option<String>,
    pub topic: Option<String>,
    pub category: Option<PostCategory>,
    pub image_engine: ImageEngine,
    pub reference_image_url: Option<String>,
    pub feedback: Option<String>,
    pub previous_title: Option<String>,
    pub previous_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    /// Topic the upstream news/topic source picked when the caller did not
    /// supply one.
    pub source_topic: Option<String>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GenerationError>;

    /// Best-effort release of any upstream resource reserved for a draft.
    /// Called on cancel; failures must be swallowed by implementations.
    async fn discard(&self, preview_id: Uuid) {
        let _ = preview_id;
    }
}

/// HTTP client for the external generation API. No automatic retry: a failed
/// generation may already have consumed paid quota, so retrying is the
/// caller's explicit decision.
pub struct HttpContentGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl HttpContentGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        builder
    }

    async fn upstream_error(response: reqwest::Response) -> GenerationError {
        let status = response.status().as_u16();
        let message = match response.json::<UpstreamErrorBody>().await {
            Ok(body) => body
                .message
                .or(body.error)
                .unwrap_or_else(|| "generation failed".to_string()),
            Err(_) => "generation failed".to_string(),
        };
        GenerationError::Upstream { status, message }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GenerationError> {
        let response = self
            .request(reqwest::Method::POST, "/v1/generations")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let content: GeneratedContent = response.json().await?;
        if content.image_url.trim().is_empty() {
            return Err(GenerationError::MissingImage);
        }
        Ok(content)
    }

    async fn discard(&self, preview_id: Uuid) {
        let result = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/generations/{preview_id}/discard"),
            )
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    %preview_id,
                    status = %response.status(),
                    "Upstream discard returned an error; draft is dropped locally anyway"
                );
            }
            Err(err) => {
                tracing::warn!(%preview_id, error = %err, "Failed to notify upstream of discarded draft");
            }
            Ok(_) => {}
        }
    }
}
