//! Migration: Create the user table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TbUser::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TbUser::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TbUser::Name).string().not_null())
                    .col(ColumnDef::new(TbUser::Email).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TbUser::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TbUser {
    Table,
    Id,
    Name,
    Email,
}
