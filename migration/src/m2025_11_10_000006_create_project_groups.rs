//! Migration to create the project_groups table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectGroups::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectGroups::DomainId).text().not_null())
                    .col(ColumnDef::new(ProjectGroups::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(ProjectGroups::Name).text().not_null())
                    .col(ColumnDef::new(ProjectGroups::ReferenceId).text().null())
                    .col(ColumnDef::new(ProjectGroups::ParentGroupId).uuid().null())
                    .col(
                        ColumnDef::new(ProjectGroups::IsManaged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProjectGroups::TrustedAccountId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProjectGroups::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProjectGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProjectGroups::UpdatedAt)
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
                    .name("idx_project_groups_reference")
                    .table(ProjectGroups::Table)
                    .col(ProjectGroups::DomainId)
                    .col(ProjectGroups::WorkspaceId)
                    .col(ProjectGroups::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_project_groups_reference")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProjectGroups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectGroups {
    Table,
    Id,
    DomainId,
    WorkspaceId,
    Name,
    ReferenceId,
    ParentGroupId,
    IsManaged,
    TrustedAccountId,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
