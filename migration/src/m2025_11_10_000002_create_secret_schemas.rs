//! Migration to create the secret_schemas table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SecretSchemas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecretSchemas::SchemaId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecretSchemas::Name).text().not_null())
                    .col(ColumnDef::new(SecretSchemas::Usage).text().not_null())
                    .col(
                        ColumnDef::new(SecretSchemas::RequiredFields)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecretSchemas::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecretSchemas::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SecretSchemas {
    Table,
    SchemaId,
    Name,
    Usage,
    RequiredFields,
    CreatedAt,
}
