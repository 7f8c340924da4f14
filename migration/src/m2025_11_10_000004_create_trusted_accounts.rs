//! Migration to create the trusted_accounts table.
//!
//! A trusted account binds a provider credential to a sync schedule. Schedule
//! hours are stored as a JSON array of UTC hours; the enabled flag is a plain
//! column so the hourly sweep can filter on it directly.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrustedAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrustedAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrustedAccounts::DomainId).text().not_null())
                    .col(ColumnDef::new(TrustedAccounts::WorkspaceId).uuid().null())
                    .col(
                        ColumnDef::new(TrustedAccounts::ResourceGroup)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrustedAccounts::Name).text().not_null())
                    .col(ColumnDef::new(TrustedAccounts::Provider).text().not_null())
                    .col(
                        ColumnDef::new(TrustedAccounts::SecretSchemaId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::TrustedSecretId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::ScheduleEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::ScheduleHours)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::SyncOptions)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::PluginOptions)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TrustedAccounts::UpdatedAt)
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
                    .name("idx_trusted_accounts_schedule_enabled")
                    .table(TrustedAccounts::Table)
                    .col(TrustedAccounts::ScheduleEnabled)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trusted_accounts_domain")
                    .table(TrustedAccounts::Table)
                    .col(TrustedAccounts::DomainId)
                    .col(TrustedAccounts::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_trusted_accounts_schedule_enabled")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_trusted_accounts_domain").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TrustedAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrustedAccounts {
    Table,
    Id,
    DomainId,
    WorkspaceId,
    ResourceGroup,
    Name,
    Provider,
    SecretSchemaId,
    TrustedSecretId,
    ScheduleEnabled,
    ScheduleHours,
    SyncOptions,
    PluginOptions,
    CreatedAt,
    UpdatedAt,
}
