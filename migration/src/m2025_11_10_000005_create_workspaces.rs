//! Migration to create the workspaces table.
//!
//! `reference_ids` holds every provider-side id that currently maps onto the
//! workspace; a provider id belongs to at most one workspace per domain.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workspaces::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workspaces::DomainId).text().not_null())
                    .col(ColumnDef::new(Workspaces::Name).text().not_null())
                    .col(ColumnDef::new(Workspaces::Tags).json_binary().not_null())
                    .col(
                        ColumnDef::new(Workspaces::ReferenceIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::IsManaged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Workspaces::TrustedAccountId).uuid().null())
                    .col(
                        ColumnDef::new(Workspaces::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Workspaces::UpdatedAt)
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
                    .name("idx_workspaces_domain_name")
                    .table(Workspaces::Table)
                    .col(Workspaces::DomainId)
                    .col(Workspaces::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_workspaces_domain_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
    DomainId,
    Name,
    Tags,
    ReferenceIds,
    IsManaged,
    TrustedAccountId,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
