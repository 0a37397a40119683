use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::agent, models::post::PostCategory};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Agent not found")]
    AgentNotFound,
    #[error("An agent with this handle already exists")]
    DuplicateHandle,
}

/// Per-agent auto-post scheduling preferences, stored as JSON on the agent row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct AutoPostSettings {
    /// Cadence label understood by the scheduler, e.g. "daily" or "weekly".
    pub frequency: Option<String>,
    /// Preferred local time of day in "HH:MM".
    pub preferred_time: Option<String>,
    #[serde(default)]
    pub categories: Vec<PostCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Agent {
    pub id: Uuid,
    pub handle: String,
    pub display_name: String,
    pub persona: Option<String>,
    pub auto_post_enabled: bool,
    #[ts(type = "Date | null")]
    pub last_auto_post_at: Option<DateTime<Utc>>,
    pub auto_post_settings: AutoPostSettings,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateAgent {
    pub handle: String,
    pub display_name: String,
    pub persona: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateAutoPostSettings {
    pub auto_post_enabled: Option<bool>,
    pub auto_post_settings: Option<AutoPostSettings>,
}

fn map_row(model: agent::Model) -> Result<Agent, AgentError> {
    let auto_post_settings: AutoPostSettings = serde_json::from_value(model.auto_post_settings)?;

    Ok(Agent {
        id: model.uuid,
        handle: model.handle,
        display_name: model.display_name,
        persona: model.persona,
        auto_post_enabled: model.auto_post_enabled,
        last_auto_post_at: model.last_auto_post_at,
        auto_post_settings,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl Agent {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateAgent,
        id: Uuid,
    ) -> Result<Self, AgentError> {
        let existing = agent::Entity::find()
            .filter(agent::Column::Handle.eq(data.handle.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AgentError::DuplicateHandle);
        }

        let active = agent::ActiveModel {
            uuid: Set(id),
            handle: Set(data.handle.clone()),
            display_name: Set(data.display_name.clone()),
            persona: Set(data.persona.clone()),
            auto_post_enabled: Set(false),
            last_auto_post_at: Set(None),
            auto_post_settings: Set(serde_json::to_value(AutoPostSettings::default())?),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        map_row(model)
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, AgentError> {
        let records = agent::Entity::find()
            .order_by_desc(agent::Column::CreatedAt)
            .all(db)
            .await?;
        records.into_iter().map(map_row).collect()
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, AgentError> {
        let record = agent::Entity::find()
            .filter(agent::Column::Uuid.eq(id))
            .one(db)
            .await?;
        record.map(map_row).transpose()
    }

    pub async fn find_by_handle<C: ConnectionTrait>(
        db: &C,
        handle: &str,
    ) -> Result<Option<Self>, AgentError> {
        let record = agent::Entity::find()
            .filter(agent::Column::Handle.eq(handle))
            .one(db)
            .await?;
        record.map(map_row).transpose()
    }

    pub async fn update_auto_post<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateAutoPostSettings,
    ) -> Result<Self, AgentError> {
        let record = agent::Entity::find()
            .filter(agent::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AgentError::AgentNotFound)?;

        let mut active = record.into_active_model();
        if let Some(enabled) = data.auto_post_enabled {
            active.auto_post_enabled = Set(enabled);
        }
        if let Some(settings) = &data.auto_post_settings {
            active.auto_post_settings = Set(serde_json::to_value(settings)?);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(db).await?;
        map_row(model)
    }

    /// Records a successful publication for this agent.
    pub async fn touch_last_auto_post<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AgentError> {
        let record = agent::Entity::find()
            .filter(agent::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AgentError::AgentNotFound)?;

        let mut active = record.into_active_model();
        active.last_auto_post_at = Set(Some(at));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }
}
