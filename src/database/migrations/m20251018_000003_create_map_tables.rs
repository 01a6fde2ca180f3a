use sea_orm_migration::prelude::*;

use super::m20251018_000001_create_auth_tables::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GeneratedMaps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GeneratedMaps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GeneratedMaps::Name).string().not_null())
                    .col(ColumnDef::new(GeneratedMaps::Description).text().null())
                    .col(ColumnDef::new(GeneratedMaps::Prompt).text().null())
                    .col(ColumnDef::new(GeneratedMaps::Geojson).text().not_null())
                    .col(ColumnDef::new(GeneratedMaps::OwnerId).integer().not_null())
                    .col(ColumnDef::new(GeneratedMaps::IsPublic).boolean().not_null().default(false))
                    .col(ColumnDef::new(GeneratedMaps::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(GeneratedMaps::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generated_maps_owner_id")
                            .from(GeneratedMaps::Table, GeneratedMaps::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SharedMapLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SharedMapLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SharedMapLinks::Title).string().not_null())
                    .col(ColumnDef::new(SharedMapLinks::Description).text().null())
                    .col(ColumnDef::new(SharedMapLinks::MapData).text().not_null())
                    .col(ColumnDef::new(SharedMapLinks::ShareToken).string().not_null())
                    .col(ColumnDef::new(SharedMapLinks::IsPublic).boolean().not_null().default(true))
                    .col(ColumnDef::new(SharedMapLinks::ViewCount).big_integer().not_null().default(0))
                    .col(ColumnDef::new(SharedMapLinks::OwnerId).integer().not_null())
                    .col(ColumnDef::new(SharedMapLinks::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SharedMapLinks::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shared_map_links_owner_id")
                            .from(SharedMapLinks::Table, SharedMapLinks::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shared_map_links_share_token")
                    .table(SharedMapLinks::Table)
                    .col(SharedMapLinks::ShareToken)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SharedMapLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GeneratedMaps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GeneratedMaps {
    Table,
    Id,
    Name,
    Description,
    Prompt,
    Geojson,
    OwnerId,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SharedMapLinks {
    Table,
    Id,
    Title,
    Description,
    MapData,
    ShareToken,
    IsPublic,
    ViewCount,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}
