//! Create survey answer table migration.
//!
//! The unique index on (survey_id, user_id) is the storage-layer guarantee
//! behind at-most-one-answer-per-user; the in-process existence check in the
//! service is only an early exit.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SurveyAnswer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SurveyAnswer::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SurveyAnswer::SurveyId).uuid().not_null())
                    .col(ColumnDef::new(SurveyAnswer::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(SurveyAnswer::Blocks)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SurveyAnswer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_answer_survey")
                            .from(SurveyAnswer::Table, SurveyAnswer::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one answer per (survey, user)
        manager
            .create_index(
                Index::create()
                    .name("ux_survey_answer_survey_user")
                    .table(SurveyAnswer::Table)
                    .col(SurveyAnswer::SurveyId)
                    .col(SurveyAnswer::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: survey_id (for answer lookups and bulk deletion)
        manager
            .create_index(
                Index::create()
                    .name("idx_survey_answer_survey_id")
                    .table(SurveyAnswer::Table)
                    .col(SurveyAnswer::SurveyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SurveyAnswer::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SurveyAnswer {
    Table,
    Id,
    SurveyId,
    UserId,
    Blocks,
    CreatedAt,
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
}
