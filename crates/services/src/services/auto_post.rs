use std::sync::Arc;

use chrono::Utc;
use db::{
    DbErr, DbPool, TransactionTrait,
    models::{
        agent::{Agent, AgentError},
        post::{CreatePost, ImageEngine, Post, PostCategory, PostError, PostType},
        reference_image::{ReferenceImage, ReferenceImageError},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::services::{
    generation::{ContentGenerator, GenerationError, GenerationRequest},
    preview_store::{DraftPost, PreviewEntry, PreviewStore, PreviewStoreError},
};

#[derive(Debug, Error)]
pub enum AutoPostError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Agent not found")]
    AgentNotFound,
    #[error("Preview not found")]
    PreviewNotFound,
    #[error("Preview was superseded (expected version {expected}, current {current})")]
    StalePreview { expected: i32, current: i32 },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Failed to publish post: {0}")]
    Publication(#[source] DbErr),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<AgentError> for AutoPostError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::AgentNotFound => AutoPostError::AgentNotFound,
            AgentError::Database(db_err) => AutoPostError::Database(db_err),
            AgentError::Serde(serde_err) => {
                AutoPostError::Database(DbErr::Custom(serde_err.to_string()))
            }
            AgentError::DuplicateHandle => {
                AutoPostError::Validation("An agent with this handle already exists".to_string())
            }
        }
    }
}

impl From<ReferenceImageError> for AutoPostError {
    fn from(err: ReferenceImageError) -> Self {
        match err {
            ReferenceImageError::AgentNotFound => AutoPostError::AgentNotFound,
            ReferenceImageError::Database(db_err) => AutoPostError::Database(db_err),
            ReferenceImageError::NotFound => {
                AutoPostError::Validation("Reference image not found".to_string())
            }
            ReferenceImageError::DuplicateUrl => AutoPostError::Validation(
                "This image is already registered for the agent".to_string(),
            ),
        }
    }
}

impl From<PreviewStoreError> for AutoPostError {
    fn from(err: PreviewStoreError) -> Self {
        match err {
            PreviewStoreError::NotFound => AutoPostError::PreviewNotFound,
            PreviewStoreError::StaleVersion { expected, current } => {
                AutoPostError::StalePreview { expected, current }
            }
        }
    }
}

fn publication_error(err: PostError) -> AutoPostError {
    match err {
        PostError::Database(db_err) => AutoPostError::Publication(db_err),
        PostError::AgentNotFound => AutoPostError::AgentNotFound,
        PostError::PostNotFound => AutoPostError::PreviewNotFound,
        PostError::Corrupt(value) => AutoPostError::Publication(DbErr::Custom(value)),
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct GeneratePreviewRequest {
    pub agent_id: Uuid,
    pub topic: Option<String>,
    pub category: Option<PostCategory>,
    pub image_engine: ImageEngine,
    pub reference_image_url: Option<String>,
    /// Steering text for a regeneration; requires `previous_preview_id`.
    pub feedback: Option<String>,
    pub previous_preview_id: Option<Uuid>,
    /// When supplied, the regeneration fails instead of replacing a draft
    /// that has moved past this version.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct BulkGenerateRequest {
    pub avee_ids: Vec<Uuid>,
    pub topic: Option<String>,
    pub category: Option<PostCategory>,
    pub image_engine: ImageEngine,
    pub reference_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct BulkItemResult {
    pub handle: String,
    pub agent_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct BulkGenerateResult {
    pub status: String,
    pub results: Vec<BulkItemResult>,
    pub total: usize,
    pub avee_count: usize,
}

/// Drives drafts through generate -> preview -> (regenerate)* ->
/// confirm/cancel, plus the bulk direct-publish path. One instance is shared
/// across requests; all per-lineage state lives in the [`PreviewStore`].
#[derive(Clone)]
pub struct AutoPostService {
    store: PreviewStore,
    generator: Arc<dyn ContentGenerator>,
}

impl AutoPostService {
    pub fn new(store: PreviewStore, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &PreviewStore {
        &self.store
    }

    /// Generates a draft post for review. When `feedback` and
    /// `previous_preview_id` are present this is a regeneration of an
    /// existing lineage; otherwise a new lineage is minted. Nothing is
    /// published and `last_auto_post_at` is untouched.
    pub async fn generate_preview(
        &self,
        db: &DbPool,
        request: GeneratePreviewRequest,
    ) -> Result<PreviewEntry, AutoPostError> {
        match (&request.feedback, request.previous_preview_id) {
            (Some(feedback), Some(previous_preview_id)) => {
                let feedback = feedback.clone();
                self.regenerate(
                    db,
                    previous_preview_id,
                    request.agent_id,
                    &feedback,
                    request.expected_version,
                )
                .await
            }
            (Some(_), None) => Err(AutoPostError::Validation(
                "feedback requires previous_preview_id".to_string(),
            )),
            (None, Some(_)) => Err(AutoPostError::Validation(
                "Regeneration requires non-empty feedback".to_string(),
            )),
            (None, None) => {
                let agent = self.load_enabled_agent(db, request.agent_id).await?;
                validate_reference_image(
                    db,
                    &agent,
                    request.image_engine,
                    request.reference_image_url.as_deref(),
                )
                .await?;

                let content = self
                    .generator
                    .generate(&GenerationRequest {
                        agent_handle: agent.handle.clone(),
                        persona: agent.persona.clone(),
                        topic: request.topic.clone(),
                        category: request.category,
                        image_engine: request.image_engine,
                        reference_image_url: request.reference_image_url.clone(),
                        feedback: None,
                        previous_title: None,
                        previous_description: None,
                    })
                    .await?;

                let draft = DraftPost {
                    title: content.title,
                    description: content.description,
                    image_url: content.image_url,
                    post_type: PostType::AiGenerated,
                    source_topic: content.source_topic.or(request.topic),
                    source_category: request.category,
                    image_engine: request.image_engine,
                    reference_image_url: request.reference_image_url,
                };

                let entry = self.store.insert(agent.id, draft);
                tracing::debug!(
                    preview_id = %entry.preview_id,
                    agent = %agent.handle,
                    "Registered draft preview"
                );
                Ok(entry)
            }
        }
    }

    /// Re-generates the draft for a live lineage, steering with `feedback`.
    /// The prior draft is superseded by replacement, never confirmed or
    /// cancelled implicitly.
    pub async fn regenerate(
        &self,
        db: &DbPool,
        preview_id: Uuid,
        agent_id: Uuid,
        feedback: &str,
        expected_version: Option<i32>,
    ) -> Result<PreviewEntry, AutoPostError> {
        if feedback.trim().is_empty() {
            return Err(AutoPostError::Validation(
                "Regeneration requires non-empty feedback".to_string(),
            ));
        }

        let previous = self
            .store
            .get(preview_id, agent_id)
            .ok_or(AutoPostError::PreviewNotFound)?;
        if let Some(expected) = expected_version
            && expected != previous.version
        {
            return Err(AutoPostError::StalePreview {
                expected,
                current: previous.version,
            });
        }

        let agent = self.load_enabled_agent(db, agent_id).await?;

        let content = self
            .generator
            .generate(&GenerationRequest {
                agent_handle: agent.handle.clone(),
                persona: agent.persona.clone(),
                topic: previous.draft.source_topic.clone(),
                category: previous.draft.source_category,
                image_engine: previous.draft.image_engine,
                reference_image_url: previous.draft.reference_image_url.clone(),
                feedback: Some(feedback.to_string()),
                previous_title: previous.draft.title.clone(),
                previous_description: previous.draft.description.clone(),
            })
            .await?;

        let draft = DraftPost {
            title: content.title,
            description: content.description,
            image_url: content.image_url,
            post_type: previous.draft.post_type,
            source_topic: content.source_topic.or(previous.draft.source_topic),
            source_category: previous.draft.source_category,
            image_engine: previous.draft.image_engine,
            reference_image_url: previous.draft.reference_image_url,
        };

        let entry = self
            .store
            .replace(preview_id, agent_id, expected_version, draft)?;
        tracing::debug!(
            preview_id = %entry.preview_id,
            version = entry.version,
            agent = %agent.handle,
            "Replaced draft preview after regeneration"
        );
        Ok(entry)
    }

    /// Publishes the draft for a lineage, applying any title/description
    /// overrides. A stale `expected_version` is rejected so a reviewer never
    /// publishes a draft that was regenerated under them. On publication
    /// failure the draft is kept so the caller can retry or cancel; on
    /// success the lineage is gone and a second confirm fails with
    /// `PreviewNotFound`.
    pub async fn confirm(
        &self,
        db: &DbPool,
        preview_id: Uuid,
        agent_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<Post, AutoPostError> {
        let entry = self
            .store
            .get(preview_id, agent_id)
            .ok_or(AutoPostError::PreviewNotFound)?;
        if let Some(expected) = expected_version
            && expected != entry.version
        {
            return Err(AutoPostError::StalePreview {
                expected,
                current: entry.version,
            });
        }

        if entry.draft.image_url.trim().is_empty() {
            return Err(AutoPostError::Validation(
                "Draft has no image and cannot be published".to_string(),
            ));
        }

        let create = CreatePost {
            title: title.or(entry.draft.title),
            description: description.or(entry.draft.description),
            image_url: entry.draft.image_url,
            post_type: entry.draft.post_type,
            source_topic: entry.draft.source_topic,
            source_category: entry.draft.source_category,
            image_engine: entry.draft.image_engine,
        };

        let tx = db.begin().await?;
        let post = Post::create(&tx, agent_id, &create, Uuid::new_v4())
            .await
            .map_err(publication_error)?;
        Agent::touch_last_auto_post(&tx, agent_id, Utc::now())
            .await
            .map_err(|err| match err {
                AgentError::Database(db_err) => AutoPostError::Publication(db_err),
                other => other.into(),
            })?;
        tx.commit().await.map_err(AutoPostError::Publication)?;

        self.store.remove(preview_id, agent_id);
        tracing::info!(
            post_id = %post.id,
            %preview_id,
            %agent_id,
            "Published confirmed draft"
        );
        Ok(post)
    }

    /// Discards the draft for a lineage. Always succeeds from the caller's
    /// perspective; releasing upstream resources is best-effort and failures
    /// are only logged.
    pub async fn cancel(&self, preview_id: Uuid, agent_id: Uuid) {
        if self.store.remove(preview_id, agent_id).is_some() {
            self.generator.discard(preview_id).await;
            tracing::debug!(%preview_id, %agent_id, "Cancelled draft preview");
        }
    }

    /// Generates and immediately publishes for each agent, with no review
    /// step. Failures are isolated per agent; the aggregate result reports
    /// per-item success so callers can render partial failure.
    pub async fn generate_for_many(
        &self,
        db: &DbPool,
        request: BulkGenerateRequest,
    ) -> Result<BulkGenerateResult, AutoPostError> {
        let avee_count = request.avee_ids.len();
        let mut results = Vec::with_capacity(avee_count);

        for agent_id in &request.avee_ids {
            let outcome = self.generate_and_publish_one(db, *agent_id, &request).await;
            let handle = match Agent::find_by_id(db, *agent_id).await {
                Ok(Some(agent)) => agent.handle,
                _ => agent_id.to_string(),
            };
            match outcome {
                Ok(post) => {
                    tracing::debug!(agent = %handle, post_id = %post.id, "Bulk generation published post");
                    results.push(BulkItemResult {
                        handle,
                        agent_id: *agent_id,
                        success: true,
                        error: None,
                    });
                }
                Err(err) => {
                    tracing::warn!(agent = %handle, error = %err, "Bulk generation failed for agent");
                    results.push(BulkItemResult {
                        handle,
                        agent_id: *agent_id,
                        success: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(BulkGenerateResult {
            status: "completed".to_string(),
            total: results.len(),
            results,
            avee_count,
        })
    }

    async fn generate_and_publish_one(
        &self,
        db: &DbPool,
        agent_id: Uuid,
        request: &BulkGenerateRequest,
    ) -> Result<Post, AutoPostError> {
        let agent = self.load_enabled_agent(db, agent_id).await?;
        validate_reference_image(
            db,
            &agent,
            request.image_engine,
            request.reference_image_url.as_deref(),
        )
        .await?;

        let content = self
            .generator
            .generate(&GenerationRequest {
                agent_handle: agent.handle.clone(),
                persona: agent.persona.clone(),
                topic: request.topic.clone(),
                category: request.category,
                image_engine: request.image_engine,
                reference_image_url: request.reference_image_url.clone(),
                feedback: None,
                previous_title: None,
                previous_description: None,
            })
            .await?;

        let create = CreatePost {
            title: content.title,
            description: content.description,
            image_url: content.image_url,
            post_type: PostType::AiGenerated,
            source_topic: content.source_topic.or_else(|| request.topic.clone()),
            source_category: request.category,
            image_engine: request.image_engine,
        };

        let tx = db.begin().await?;
        let post = Post::create(&tx, agent_id, &create, Uuid::new_v4())
            .await
            .map_err(publication_error)?;
        Agent::touch_last_auto_post(&tx, agent_id, Utc::now())
            .await
            .map_err(|err| match err {
                AgentError::Database(db_err) => AutoPostError::Publication(db_err),
                other => other.into(),
            })?;
        tx.commit().await.map_err(AutoPostError::Publication)?;

        Ok(post)
    }

    async fn load_enabled_agent(
        &self,
        db: &DbPool,
        agent_id: Uuid,
    ) -> Result<Agent, AutoPostError> {
        let agent = Agent::find_by_id(db, agent_id)
            .await?
            .ok_or(AutoPostError::AgentNotFound)?;
        if !agent.auto_post_enabled {
            return Err(AutoPostError::Validation(
                "Auto-post is disabled for this agent".to_string(),
            ));
        }
        Ok(agent)
    }
}

async fn validate_reference_image(
    db: &DbPool,
    agent: &Agent,
    image_engine: ImageEngine,
    reference_image_url: Option<&str>,
) -> Result<(), AutoPostError> {
    let Some(url) = reference_image_url else {
        return Ok(());
    };

    if image_engine != ImageEngine::GptImage1 {
        return Err(AutoPostError::Validation(
            "A reference image is only supported with the gpt-image-1 engine".to_string(),
        ));
    }

    if !ReferenceImage::belongs_to_agent(db, agent.id, url).await? {
        return Err(AutoPostError::Validation(
            "Reference image does not belong to this agent".to_string(),
        ));
    }

    Ok(())
}
