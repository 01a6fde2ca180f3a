use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReferenceDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferenceDocuments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReferenceDocuments::Name).string().not_null())
                    .col(ColumnDef::new(ReferenceDocuments::Description).text().null())
                    .col(ColumnDef::new(ReferenceDocuments::UsagePrompt).text().null())
                    .col(ColumnDef::new(ReferenceDocuments::Tags).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(ReferenceDocuments::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ReferenceDocuments::EmbeddingProcessed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReferenceDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferenceDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GenerationLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GenerationLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GenerationLogs::UserId).integer().null())
                    .col(ColumnDef::new(GenerationLogs::Prompt).text().not_null())
                    .col(ColumnDef::new(GenerationLogs::RawResponse).text().null())
                    .col(ColumnDef::new(GenerationLogs::ParsedResponse).text().null())
                    .col(ColumnDef::new(GenerationLogs::Success).boolean().not_null())
                    .col(ColumnDef::new(GenerationLogs::ErrorMessage).text().null())
                    .col(ColumnDef::new(GenerationLogs::ModelName).string().not_null())
                    .col(ColumnDef::new(GenerationLogs::SystemPrompt).text().not_null())
                    .col(ColumnDef::new(GenerationLogs::DurationMs).big_integer().not_null())
                    .col(
                        ColumnDef::new(GenerationLogs::Validated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(GenerationLogs::ValidationNotes).text().null())
                    .col(ColumnDef::new(GenerationLogs::CorrectedGeometry).text().null())
                    .col(ColumnDef::new(GenerationLogs::ValidatedBy).integer().null())
                    .col(
                        ColumnDef::new(GenerationLogs::ValidatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GenerationLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_generation_logs_created_at")
                    .table(GenerationLogs::Table)
                    .col(GenerationLogs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GenerationLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReferenceDocuments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReferenceDocuments {
    Table,
    Id,
    Name,
    Description,
    UsagePrompt,
    Tags,
    IsActive,
    EmbeddingProcessed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GenerationLogs {
    Table,
    Id,
    UserId,
    Prompt,
    RawResponse,
    ParsedResponse,
    Success,
    ErrorMessage,
    ModelName,
    SystemPrompt,
    DurationMs,
    Validated,
    ValidationNotes,
    CorrectedGeometry,
    ValidatedBy,
    ValidatedAt,
    CreatedAt,
}
