//! Create question table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_form_table::Form;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Question::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(Question::FormId).string_len(36).not_null())
                    .col(ColumnDef::new(Question::Text).text().not_null())
                    .col(ColumnDef::new(Question::Type).string_len(16).not_null())
                    .col(ColumnDef::new(Question::Order).integer().not_null())
                    .col(ColumnDef::new(Question::Required).boolean().not_null().default(false))
                    .col(ColumnDef::new(Question::Options).json_binary())
                    .col(
                        ColumnDef::new(Question::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Question::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_form")
                            .from(Question::Table, Question::FormId)
                            .to(Form::Table, Form::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (form_id, order) for ordered listing; not unique, reorders pass through duplicates
        manager
            .create_index(
                Index::create()
                    .name("idx_question_form_id_order")
                    .table(Question::Table)
                    .col(Question::FormId)
                    .col(Question::Order)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
    FormId,
    Text,
    Type,
    Order,
    Required,
    Options,
    CreatedAt,
    UpdatedAt,
}
