use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::agent;

pub async fn agent_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    agent::Entity::find()
        .select_only()
        .column(agent::Column::Id)
        .filter(agent::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn agent_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    agent::Entity::find()
        .select_only()
        .column(agent::Column::Uuid)
        .filter(agent::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}
