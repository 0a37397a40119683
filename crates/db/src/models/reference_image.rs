use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::reference_image, models::ids};

#[derive(Debug, Error)]
pub enum ReferenceImageError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Agent not found")]
    AgentNotFound,
    #[error("Reference image not found")]
    NotFound,
    #[error("This image is already registered for the agent")]
    DuplicateUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReferenceImage {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub position: i32,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateReferenceImage {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
}

fn map_row(model: reference_image::Model, agent_id: Uuid) -> ReferenceImage {
    ReferenceImage {
        id: model.uuid,
        agent_id,
        url: model.url,
        is_primary: model.is_primary,
        position: model.position,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

impl ReferenceImage {
    /// Registers a new reference image at the end of the agent's ordered set.
    /// When `is_primary` is requested, any prior primary is cleared first so
    /// the at-most-one-primary invariant holds; callers that care about
    /// atomicity pass a transaction.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
        data: &CreateReferenceImage,
        id: Uuid,
    ) -> Result<Self, ReferenceImageError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(ReferenceImageError::AgentNotFound)?;

        let duplicate = reference_image::Entity::find()
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .filter(reference_image::Column::Url.eq(data.url.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ReferenceImageError::DuplicateUrl);
        }

        if data.is_primary {
            clear_primary(db, agent_row_id).await?;
        }

        let next_position = reference_image::Entity::find()
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .count(db)
            .await? as i32;

        let active = reference_image::ActiveModel {
            uuid: Set(id),
            agent_id: Set(agent_row_id),
            url: Set(data.url.clone()),
            is_primary: Set(data.is_primary),
            position: Set(next_position),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(map_row(model, agent_id))
    }

    pub async fn find_for_agent<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
    ) -> Result<Vec<Self>, ReferenceImageError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(ReferenceImageError::AgentNotFound)?;

        let records = reference_image::Entity::find()
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .order_by_asc(reference_image::Column::Position)
            .all(db)
            .await?;

        Ok(records
            .into_iter()
            .map(|model| map_row(model, agent_id))
            .collect())
    }

    /// Whether `url` is one of the agent's registered reference images.
    pub async fn belongs_to_agent<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
        url: &str,
    ) -> Result<bool, ReferenceImageError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(ReferenceImageError::AgentNotFound)?;

        let count = reference_image::Entity::find()
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .filter(reference_image::Column::Url.eq(url))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    /// Makes `image_id` the single primary image for the agent, clearing any
    /// sibling primary in the same connection.
    pub async fn set_primary<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
        image_id: Uuid,
    ) -> Result<Self, ReferenceImageError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(ReferenceImageError::AgentNotFound)?;

        let record = reference_image::Entity::find()
            .filter(reference_image::Column::Uuid.eq(image_id))
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .one(db)
            .await?
            .ok_or(ReferenceImageError::NotFound)?;

        clear_primary(db, agent_row_id).await?;

        let mut active: reference_image::ActiveModel = record.into();
        active.is_primary = Set(true);
        active.updated_at = Set(Utc::now());
        let model = active.update(db).await?;

        Ok(map_row(model, agent_id))
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        agent_id: Uuid,
        image_id: Uuid,
    ) -> Result<u64, ReferenceImageError> {
        let agent_row_id = ids::agent_id_by_uuid(db, agent_id)
            .await?
            .ok_or(ReferenceImageError::AgentNotFound)?;

        let result = reference_image::Entity::delete_many()
            .filter(reference_image::Column::Uuid.eq(image_id))
            .filter(reference_image::Column::AgentId.eq(agent_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

async fn clear_primary<C: ConnectionTrait>(db: &C, agent_row_id: i64) -> Result<(), DbErr> {
    let primaries = reference_image::Entity::find()
        .filter(reference_image::Column::AgentId.eq(agent_row_id))
        .filter(reference_image::Column::IsPrimary.eq(true))
        .all(db)
        .await?;

    for record in primaries {
        let mut active: reference_image::ActiveModel = record.into();
        active.is_primary = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
    }
    Ok(())
}
