//! Survey repository.

use crate::entities::{Survey, survey};
use crate::scope;
use sea_orm::{ActiveModelTrait, EntityTrait};
use uuid::Uuid;
use voices_common::{AppError, AppResult};

/// Survey repository for database operations.
///
/// Must be called inside an active transaction scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurveyRepository;

impl SurveyRepository {
    /// Create a new survey repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a survey by ID.
    pub async fn find_by_id(&self, survey_id: Uuid) -> AppResult<Option<survey::Model>> {
        let session = scope::current()?;
        Survey::find_by_id(survey_id)
            .one(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a survey by ID, returning error if not found.
    pub async fn get_by_id(&self, survey_id: Uuid) -> AppResult<survey::Model> {
        self.find_by_id(survey_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey not found: {survey_id}")))
    }

    /// Create a new survey.
    pub async fn create(&self, model: survey::ActiveModel) -> AppResult<survey::Model> {
        let session = scope::current()?;
        model
            .insert(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a survey.
    pub async fn update(&self, model: survey::ActiveModel) -> AppResult<survey::Model> {
        let session = scope::current()?;
        model
            .update(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a survey.
    pub async fn delete(&self, survey_id: Uuid) -> AppResult<()> {
        let session = scope::current()?;
        Survey::delete_by_id(survey_id)
            .exec(session.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
