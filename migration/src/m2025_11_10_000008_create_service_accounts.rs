//! Migration to create the service_accounts table.
//!
//! `secret_id` points at the secret currently attached to the account; it is
//! rewritten whenever the secret is rotated during a sync.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServiceAccounts::DomainId).text().not_null())
                    .col(
                        ColumnDef::new(ServiceAccounts::WorkspaceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ServiceAccounts::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ServiceAccounts::Provider).text().not_null())
                    .col(ColumnDef::new(ServiceAccounts::Name).text().not_null())
                    .col(
                        ColumnDef::new(ServiceAccounts::ReferenceId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ServiceAccounts::Data).json_binary().not_null())
                    .col(ColumnDef::new(ServiceAccounts::Tags).json_binary().not_null())
                    .col(ColumnDef::new(ServiceAccounts::SchemaId).text().null())
                    .col(ColumnDef::new(ServiceAccounts::SecretId).uuid().null())
                    .col(
                        ColumnDef::new(ServiceAccounts::IsManaged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ServiceAccounts::TrustedAccountId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ServiceAccounts::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ServiceAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ServiceAccounts::UpdatedAt)
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
                    .name("idx_service_accounts_reference")
                    .table(ServiceAccounts::Table)
                    .col(ServiceAccounts::DomainId)
                    .col(ServiceAccounts::WorkspaceId)
                    .col(ServiceAccounts::Provider)
                    .col(ServiceAccounts::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_service_accounts_reference")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ServiceAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceAccounts {
    Table,
    Id,
    DomainId,
    WorkspaceId,
    ProjectId,
    Provider,
    Name,
    ReferenceId,
    Data,
    Tags,
    SchemaId,
    SecretId,
    IsManaged,
    TrustedAccountId,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
