use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EpciRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EpciRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EpciRecords::Name).string().not_null())
                    .col(ColumnDef::new(EpciRecords::Siren).string().null())
                    .col(ColumnDef::new(EpciRecords::Geojson).text().null())
                    .col(ColumnDef::new(EpciRecords::GeojsonUrl).string().null())
                    .col(ColumnDef::new(EpciRecords::Population).big_integer().null())
                    .col(ColumnDef::new(EpciRecords::AreaKm2).double().null())
                    .col(ColumnDef::new(EpciRecords::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(EpciRecords::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(EpciRecords::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GeojsonTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GeojsonTemplates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GeojsonTemplates::Name).string().not_null())
                    .col(ColumnDef::new(GeojsonTemplates::Description).text().null())
                    .col(ColumnDef::new(GeojsonTemplates::Category).string().null())
                    .col(ColumnDef::new(GeojsonTemplates::Geojson).text().null())
                    .col(ColumnDef::new(GeojsonTemplates::GeojsonUrl).string().null())
                    .col(ColumnDef::new(GeojsonTemplates::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(GeojsonTemplates::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(GeojsonTemplates::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GeojsonTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EpciRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EpciRecords {
    Table,
    Id,
    Name,
    Siren,
    Geojson,
    GeojsonUrl,
    Population,
    AreaKm2,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GeojsonTemplates {
    Table,
    Id,
    Name,
    Description,
    Category,
    Geojson,
    GeojsonUrl,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
