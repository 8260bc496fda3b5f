//! Create form table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_user_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Form::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Form::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(Form::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Form::Description).text())
                    .col(ColumnDef::new(Form::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Form::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Form::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Form::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_user")
                            .from(Form::Table, Form::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) for listing a user's forms newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_form_user_id_created_at")
                    .table(Form::Table)
                    .col(Form::UserId)
                    .col(Form::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Form::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Form {
    Table,
    Id,
    Title,
    Description,
    UserId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
