use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Agents::Table)
                    .col(pk_id_col(manager, Agents::Id))
                    .col(uuid_col(Agents::Uuid))
                    .col(ColumnDef::new(Agents::Handle).string().not_null())
                    .col(ColumnDef::new(Agents::DisplayName).string().not_null())
                    .col(ColumnDef::new(Agents::Persona).text())
                    .col(
                        ColumnDef::new(Agents::AutoPostEnabled)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(Agents::LastAutoPostAt).timestamp())
                    .col(ColumnDef::new(Agents::AutoPostSettings).json().not_null())
                    .col(timestamp_col(Agents::CreatedAt))
                    .col(timestamp_col(Agents::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_agents_uuid")
                    .table(Agents::Table)
                    .col(Agents::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_agents_handle")
                    .table(Agents::Table)
                    .col(Agents::Handle)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(ReferenceImages::Table)
                    .col(pk_id_col(manager, ReferenceImages::Id))
                    .col(uuid_col(ReferenceImages::Uuid))
                    .col(fk_id_col(manager, ReferenceImages::AgentId))
                    .col(ColumnDef::new(ReferenceImages::Url).string().not_null())
                    .col(
                        ColumnDef::new(ReferenceImages::IsPrimary)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(ReferenceImages::Position)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(timestamp_col(ReferenceImages::CreatedAt))
                    .col(timestamp_col(ReferenceImages::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reference_images_agent_id")
                            .from(ReferenceImages::Table, ReferenceImages::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reference_images_uuid")
                    .table(ReferenceImages::Table)
                    .col(ReferenceImages::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reference_images_agent_id")
                    .table(ReferenceImages::Table)
                    .col(ReferenceImages::AgentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reference_images_agent_url")
                    .table(ReferenceImages::Table)
                    .col(ReferenceImages::AgentId)
                    .col(ReferenceImages::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Posts::Table)
                    .col(pk_id_col(manager, Posts::Id))
                    .col(uuid_col(Posts::Uuid))
                    .col(fk_id_col(manager, Posts::AgentId))
                    .col(ColumnDef::new(Posts::Title).string())
                    .col(ColumnDef::new(Posts::Description).text())
                    .col(ColumnDef::new(Posts::ImageUrl).string().not_null())
                    .col(
                        ColumnDef::new(Posts::PostType)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("ai_generated")),
                    )
                    .col(ColumnDef::new(Posts::SourceTopic).string())
                    .col(ColumnDef::new(Posts::SourceCategory).string_len(32))
                    .col(
                        ColumnDef::new(Posts::ImageEngine)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(timestamp_col(Posts::CreatedAt))
                    .col(timestamp_col(Posts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_agent_id")
                            .from(Posts::Table, Posts::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_posts_uuid")
                    .table(Posts::Table)
                    .col(Posts::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_posts_agent_id")
                    .table(Posts::Table)
                    .col(Posts::AgentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReferenceImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Agents::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden + 'static>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden + 'static>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Agents {
    Table,
    Id,
    Uuid,
    Handle,
    DisplayName,
    Persona,
    AutoPostEnabled,
    LastAutoPostAt,
    AutoPostSettings,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ReferenceImages {
    Table,
    Id,
    Uuid,
    AgentId,
    Url,
    IsPrimary,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Posts {
    Table,
    Id,
    Uuid,
    AgentId,
    Title,
    Description,
    ImageUrl,
    PostType,
    SourceTopic,
    SourceCategory,
    ImageEngine,
    CreatedAt,
    UpdatedAt,
}
