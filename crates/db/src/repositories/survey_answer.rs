//! Survey answer repository.

use crate::entities::{SurveyAnswer, survey_answer};
use crate::scope;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, SqlErr,
};
use uuid::Uuid;
use voices_common::{AppError, AppResult};

/// Survey answer repository for database operations.
///
/// Must be called inside an active transaction scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurveyAnswerRepository;

impl SurveyAnswerRepository {
    /// Create a new survey answer repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a user's answer to a survey.
    pub async fn find_by_survey_and_user(
        &self,
        survey_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<survey_answer::Model>> {
        let session = scope::current()?;
        SurveyAnswer::find()
            .filter(survey_answer::Column::SurveyId.eq(survey_id))
            .filter(survey_answer::Column::UserId.eq(user_id))
            .one(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has already answered a survey.
    pub async fn has_answered(&self, survey_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let session = scope::current()?;
        let count = SurveyAnswer::find()
            .filter(survey_answer::Column::SurveyId.eq(survey_id))
            .filter(survey_answer::Column::UserId.eq(user_id))
            .count(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new answer.
    ///
    /// The unique index on (`survey_id`, `user_id`) is the source of truth
    /// for at-most-one-answer-per-user; a constraint violation here maps to
    /// [`AppError::AlreadyVoted`].
    pub async fn create(&self, model: survey_answer::ActiveModel) -> AppResult<survey_answer::Model> {
        let session = scope::current()?;
        model.insert(session.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::AlreadyVoted
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete all answers for a survey (bulk survey deletion).
    pub async fn delete_by_survey(&self, survey_id: Uuid) -> AppResult<u64> {
        let session = scope::current()?;
        let result = SurveyAnswer::delete_many()
            .filter(survey_answer::Column::SurveyId.eq(survey_id))
            .exec(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
