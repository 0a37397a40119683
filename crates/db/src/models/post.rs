use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::post, models::ids};

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Post not found")]
    PostNotFound,
    #[error("Agent not found")]
    AgentNotFound,
    #[error("Unknown value '{0}' stored for post")]
    Corrupt(String),
}

/// Image generation engine used to produce a post image. Wire values match
/// the upstream generation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, TS)]
pub enum ImageEngine {
    #[serde(rename = "dall-e-3")]
    #[strum(serialize = "dall-e-3")]
    DallE3,
    #[serde(rename = "gpt-image-1")]
    #[strum(serialize = "gpt-image-1")]
    GptImage1,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, TS, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PostType {
    Organic,
    #[default]
    AiGenerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, TS)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PostCategory {
    News,
    Entertainment,
    Sports,
    Technology,
    Lifestyle,
    Music,
    Fashion,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Post {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub post_type: PostType,
    pub source_topic: Option<String>,
    pub source_category: Option<PostCategory>,
    pub image_engine: ImageEngine,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePost {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub post_type: PostType,
    pub source_topic: Option<String>,
    pub source_category: Option<PostCategory>,
    pub image_engine: ImageEngine,
}

fn map_row(model: post::Model, agent_id: Uuid) -> Result<Post, PostError> {
    let post_type: PostType = model
        .post_type
        .parse()
        .map_err(|_| PostError::Corrupt(model.post_type.clone()))?;
    let image_engine: ImageEngine = model
        .image_engine
        .parse()
        .map_err(|_| PostError::Corrupt(model.image_engine.clone()))?;
    let source_category = model
        .source_category
        .as_deref()
        .map(|raw| {
            raw.parse::<PostCategory>()
                .map_err(|_| PostError::Corrupt(raw.to_string()))
        })
        .transpose()?;

    Ok(Post {
        id: model.uuid,
        agent_id,
        title: model.title,
        description: model.description,
        image_url: model.image_url,
        post_type,
        source_topic: model.source_topic,
        source_category,
        image_engine,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl Post {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
        data: &CreatePost,
        id: Uuid,
    ) -> Result<Self, PostError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(PostError::AgentNotFound)?;

        let active = post::ActiveModel {
            uuid: Set(id),
            agent_id: Set(agent_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            image_url: Set(data.image_url.clone()),
            post_type: Set(data.post_type.to_string()),
            source_topic: Set(data.source_topic.clone()),
            source_category: Set(data.source_category.map(|c| c.to_string())),
            image_engine: Set(data.image_engine.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        map_row(model, agent_id)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, PostError> {
        let record = post::Entity::find()
            .filter(post::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => {
                let agent_id = ids::agent_uuid_by_id(db, model.agent_id)
                    .await?
                    .ok_or(PostError::AgentNotFound)?;
                Ok(Some(map_row(model, agent_id)?))
            }
            None => Ok(None),
        }
    }

    pub async fn find_for_agent<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
    ) -> Result<Vec<Self>, PostError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(PostError::AgentNotFound)?;

        let records = post::Entity::find()
            .filter(post::Column::AgentId.eq(agent_row_id))
            .order_by_desc(post::Column::CreatedAt)
            .all(db)
            .await?;

        records
            .into_iter()
            .map(|model| map_row(model, agent_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_engine_round_trips_wire_strings() {
        assert_eq!(ImageEngine::DallE3.to_string(), "dall-e-3");
        assert_eq!(ImageEngine::GptImage1.to_string(), "gpt-image-1");
        assert_eq!(
            "gpt-image-1".parse::<ImageEngine>().unwrap(),
            ImageEngine::GptImage1
        );
        assert!("midjourney".parse::<ImageEngine>().is_err());
    }

    #[test]
    fn image_engine_serde_uses_wire_strings() {
        let json = serde_json::to_string(&ImageEngine::DallE3).unwrap();
        assert_eq!(json, "\"dall-e-3\"");
        let engine: ImageEngine = serde_json::from_str("\"gpt-image-1\"").unwrap();
        assert_eq!(engine, ImageEngine::GptImage1);
    }

    #[test]
    fn post_type_and_category_are_snake_case() {
        assert_eq!(PostType::AiGenerated.to_string(), "ai_generated");
        assert_eq!(PostCategory::Entertainment.to_string(), "entertainment");
        assert_eq!(
            "lifestyle".parse::<PostCategory>().unwrap(),
            PostCategory::Lifestyle
        );
    }
}
