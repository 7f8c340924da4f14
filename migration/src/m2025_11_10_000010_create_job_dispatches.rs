//! Migration to create the job_dispatches table.
//!
//! Each row is one execution message for a job. The payload is an encrypted
//! JSON document because it carries the trusted account's secret data.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobDispatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobDispatches::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobDispatches::JobId).uuid().not_null())
                    .col(
                        ColumnDef::new(JobDispatches::Status)
                            .text()
                            .not_null()
                            .default("queued"),
                    )
                    .col(
                        ColumnDef::new(JobDispatches::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(JobDispatches::Payload).binary().not_null())
                    .col(
                        ColumnDef::new(JobDispatches::AvailableAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JobDispatches::ClaimedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(JobDispatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JobDispatches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_dispatches_job_id")
                            .from(JobDispatches::Table, JobDispatches::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_dispatches_status_available")
                    .table(JobDispatches::Table)
                    .col(JobDispatches::Status)
                    .col(JobDispatches::AvailableAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_job_dispatches_status_available")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(JobDispatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobDispatches {
    Table,
    Id,
    JobId,
    Status,
    Attempts,
    Payload,
    AvailableAt,
    ClaimedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
}
