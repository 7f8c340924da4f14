//! Migration to create the jobs table.
//!
//! A job is one sync run of a trusted account. `workspace_id` is text because
//! domain-wide jobs carry the `*` wildcard instead of a workspace uuid.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::DomainId).text().not_null())
                    .col(ColumnDef::new(Jobs::WorkspaceId).text().not_null())
                    .col(ColumnDef::new(Jobs::TrustedAccountId).uuid().not_null())
                    .col(ColumnDef::new(Jobs::PluginId).text().not_null())
                    .col(ColumnDef::new(Jobs::ResourceGroup).text().not_null())
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .text()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Jobs::Options).json_binary().not_null())
                    .col(ColumnDef::new(Jobs::Error).json_binary().null())
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Duplicate detection looks up in-progress jobs for one account/workspace
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_account_workspace_status")
                    .table(Jobs::Table)
                    .col(Jobs::TrustedAccountId)
                    .col(Jobs::WorkspaceId)
                    .col(Jobs::DomainId)
                    .col(Jobs::Status)
                    .to_owned(),
            )
            .await?;

        // Listing and stats are domain scoped
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_domain_status_created")
                    .table(Jobs::Table)
                    .col(Jobs::DomainId)
                    .col(Jobs::Status)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_jobs_account_workspace_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_jobs_domain_status_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    DomainId,
    WorkspaceId,
    TrustedAccountId,
    PluginId,
    ResourceGroup,
    Status,
    Options,
    Error,
    CreatedAt,
    UpdatedAt,
    FinishedAt,
}
