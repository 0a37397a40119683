use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    agent::{Agent, CreateAgent, UpdateAutoPostSettings},
    post::Post,
    reference_image::{CreateReferenceImage, ReferenceImage},
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::load_agent_middleware};

pub async fn get_agents(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Agent>>>, ApiError> {
    let agents = Agent::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(agents)))
}

pub async fn create_agent(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateAgent>,
) -> Result<ResponseJson<ApiResponse<Agent>>, ApiError> {
    if payload.handle.trim().is_empty() {
        return Err(ApiError::BadRequest("Handle must not be empty".to_string()));
    }

    tracing::debug!("Creating agent '{}'", payload.handle);

    let agent = Agent::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(agent)))
}

pub async fn get_agent(
    Extension(agent): Extension<Agent>,
) -> Result<ResponseJson<ApiResponse<Agent>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(agent)))
}

pub async fn update_auto_post_settings(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateAutoPostSettings>,
) -> Result<ResponseJson<ApiResponse<Agent>>, ApiError> {
    let updated = Agent::update_auto_post(&deployment.db().pool, agent.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn get_agent_posts(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Post>>>, ApiError> {
    let posts = Post::find_for_agent(&deployment.db().pool, agent.id).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

pub async fn get_reference_images(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ReferenceImage>>>, ApiError> {
    let images = ReferenceImage::find_for_agent(&deployment.db().pool, agent.id).await?;
    Ok(ResponseJson(ApiResponse::success(images)))
}

pub async fn create_reference_image(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateReferenceImage>,
) -> Result<ResponseJson<ApiResponse<ReferenceImage>>, ApiError> {
    if payload.url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Image url must not be empty".to_string(),
        ));
    }

    let image =
        ReferenceImage::create(&deployment.db().pool, agent.id, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(image)))
}

#[derive(Debug, Deserialize)]
pub struct ReferenceImagePath {
    #[allow(dead_code)]
    agent_id: Uuid,
    image_id: Uuid,
}

pub async fn set_primary_reference_image(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
    Path(path): Path<ReferenceImagePath>,
) -> Result<ResponseJson<ApiResponse<ReferenceImage>>, ApiError> {
    let image =
        ReferenceImage::set_primary(&deployment.db().pool, agent.id, path.image_id).await?;
    Ok(ResponseJson(ApiResponse::success(image)))
}

pub async fn delete_reference_image(
    Extension(agent): Extension<Agent>,
    State(deployment): State<DeploymentImpl>,
    Path(path): Path<ReferenceImagePath>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = ReferenceImage::delete(&deployment.db().pool, agent.id, path.image_id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("Reference image not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let agent_scoped = Router::new()
        .route("/", get(get_agent))
        .route("/auto-post-settings", put(update_auto_post_settings))
        .route("/posts", get(get_agent_posts))
        .route(
            "/reference-images",
            get(get_reference_images).post(create_reference_image),
        )
        .route(
            "/reference-images/{image_id}",
            axum::routing::delete(delete_reference_image),
        )
        .route(
            "/reference-images/{image_id}/primary",
            post(set_primary_reference_image),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_agent_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/agents", get(get_agents).post(create_agent))
        .nest("/agents/{agent_id}", agent_scoped)
}
