//! Migration to create the projects table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::DomainId).text().not_null())
                    .col(ColumnDef::new(Projects::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(Projects::ProjectGroupId).uuid().null())
                    .col(ColumnDef::new(Projects::Name).text().not_null())
                    .col(
                        ColumnDef::new(Projects::ProjectType)
                            .text()
                            .not_null()
                            .default("PRIVATE"),
                    )
                    .col(ColumnDef::new(Projects::ReferenceId).text().null())
                    .col(
                        ColumnDef::new(Projects::IsManaged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Projects::TrustedAccountId).uuid().null())
                    .col(
                        ColumnDef::new(Projects::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Projects::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_reference")
                    .table(Projects::Table)
                    .col(Projects::DomainId)
                    .col(Projects::WorkspaceId)
                    .col(Projects::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_projects_reference").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    DomainId,
    WorkspaceId,
    ProjectGroupId,
    Name,
    ProjectType,
    ReferenceId,
    IsManaged,
    TrustedAccountId,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
