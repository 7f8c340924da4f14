//! Migration to create the secrets table.
//!
//! Secret payloads are stored as AES-256-GCM ciphertext only. A row is either a
//! trusted (account-level) secret or a project-scoped secret bound to a service
//! account.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Secrets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Secrets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Secrets::DomainId).text().not_null())
                    .col(ColumnDef::new(Secrets::Name).text().not_null())
                    .col(ColumnDef::new(Secrets::ResourceGroup).text().not_null())
                    .col(ColumnDef::new(Secrets::WorkspaceId).uuid().null())
                    .col(ColumnDef::new(Secrets::ProjectId).uuid().null())
                    .col(ColumnDef::new(Secrets::ServiceAccountId).uuid().null())
                    .col(ColumnDef::new(Secrets::TrustedSecretId).uuid().null())
                    .col(ColumnDef::new(Secrets::SchemaId).text().null())
                    .col(ColumnDef::new(Secrets::Ciphertext).binary().not_null())
                    .col(
                        ColumnDef::new(Secrets::CreatedAt)
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
                    .name("idx_secrets_domain_service_account")
                    .table(Secrets::Table)
                    .col(Secrets::DomainId)
                    .col(Secrets::ServiceAccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_secrets_domain_service_account")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Secrets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Secrets {
    Table,
    Id,
    DomainId,
    Name,
    ResourceGroup,
    WorkspaceId,
    ProjectId,
    ServiceAccountId,
    TrustedSecretId,
    SchemaId,
    Ciphertext,
    CreatedAt,
}
