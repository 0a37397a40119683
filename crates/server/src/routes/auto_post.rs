use axum::{
    Json, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use db::models::{
    agent::{Agent, AutoPostSettings},
    post::Post,
    reference_image::ReferenceImage,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    auto_post::{BulkGenerateRequest, BulkGenerateResult, GeneratePreviewRequest},
    preview_store::PreviewEntry,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub async fn generate_preview(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<GeneratePreviewRequest>,
) -> Result<ResponseJson<ApiResponse<PreviewEntry>>, ApiError> {
    let entry = deployment
        .auto_post()
        .generate_preview(&deployment.db().pool, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

#[derive(Debug, Deserialize, TS)]
pub struct ConfirmPreviewRequest {
    pub preview_id: Uuid,
    pub agent_id: Uuid,
    /// Optional review edits applied on publish.
    pub title: Option<String>,
    pub description: Option<String>,
    /// When supplied, publishing fails instead of confirming a draft that
    /// was regenerated past this version.
    pub expected_version: Option<i32>,
}

pub async fn confirm_preview(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ConfirmPreviewRequest>,
) -> Result<ResponseJson<ApiResponse<Post>>, ApiError> {
    let post = deployment
        .auto_post()
        .confirm(
            &deployment.db().pool,
            payload.preview_id,
            payload.agent_id,
            payload.title,
            payload.description,
            payload.expected_version,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(post)))
}

#[derive(Debug, Deserialize, TS)]
pub struct CancelPreviewRequest {
    pub preview_id: Uuid,
    pub agent_id: Uuid,
}

pub async fn cancel_preview(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CancelPreviewRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .auto_post()
        .cancel(payload.preview_id, payload.agent_id)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn bulk_generate(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<BulkGenerateRequest>,
) -> Result<ResponseJson<ApiResponse<BulkGenerateResult>>, ApiError> {
    if payload.avee_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one agent is required".to_string(),
        ));
    }

    let result = deployment
        .auto_post()
        .generate_for_many(&deployment.db().pool, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

/// Auto-post configuration for one agent, with the reference images callers
/// need for validating `reference_image_url` choices.
#[derive(Debug, Serialize, TS)]
pub struct AgentAutoPostStatus {
    pub agent_id: Uuid,
    pub handle: String,
    pub auto_post_enabled: bool,
    pub auto_post_settings: AutoPostSettings,
    #[ts(type = "Date | null")]
    pub last_auto_post_at: Option<DateTime<Utc>>,
    pub reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub agent_id: Option<Uuid>,
}

pub async fn get_status(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<StatusQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AgentAutoPostStatus>>>, ApiError> {
    let pool = &deployment.db().pool;

    let agents = match query.agent_id {
        Some(agent_id) => {
            let agent = Agent::find_by_id(pool, agent_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Agent not found".to_string()))?;
            vec![agent]
        }
        None => Agent::find_all(pool).await?,
    };

    let mut statuses = Vec::with_capacity(agents.len());
    for agent in agents {
        let reference_images = ReferenceImage::find_for_agent(pool, agent.id).await?;
        statuses.push(AgentAutoPostStatus {
            agent_id: agent.id,
            handle: agent.handle,
            auto_post_enabled: agent.auto_post_enabled,
            auto_post_settings: agent.auto_post_settings,
            last_auto_post_at: agent.last_auto_post_at,
            reference_images,
        });
    }

    Ok(ResponseJson(ApiResponse::success(statuses)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auto-post/preview", post(generate_preview))
        .route("/auto-post/confirm", post(confirm_preview))
        .route("/auto-post/cancel", post(cancel_preview))
        .route("/auto-post/generate", post(bulk_generate))
        .route("/auto-post/status", get(get_status))
}
