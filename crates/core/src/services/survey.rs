//! Survey service.
//!
//! A survey is a structured poll attached to an initiative: an ordered list
//! of question blocks, each with ordered options carrying aggregate vote
//! statistics. Answers correspond to options positionally, by (block index,
//! option index); the option list is the join key between a submitted answer
//! and the survey structure.

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use voices_common::{AppError, AppResult, IdGenerator};
use voices_db::{
    entities::{survey, survey_answer},
    repositories::{SurveyAnswerRepository, SurveyRepository},
};

const MAX_NAME_LEN: usize = 100;
const MAX_QUESTION_LEN: usize = 200;
const MAX_OPTION_LEN: usize = 100;
const MAX_BLOCKS: usize = 20;
const MAX_CHOICE_OPTIONS: usize = 10;

/// Question type within a survey block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyType {
    /// Free text, single line.
    OneLine,
    /// Free text, multiple lines.
    MultiLine,
    /// Exactly one selectable option.
    ChooseOne,
    /// Any number of selectable options.
    ChooseMultiply,
}

impl SurveyType {
    /// Whether this block type carries selectable options.
    #[must_use]
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::ChooseOne | Self::ChooseMultiply)
    }
}

/// One answerable item within a block, carrying aggregate vote statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyOption {
    /// Display value.
    pub value: String,
    /// Running number of users who selected/answered this option.
    pub vote_count: i32,
    /// `round(vote_count / survey.vote_count * 100)`, 0 when no votes.
    pub vote_percent: i32,
    /// The requesting user's own value, populated only when rendering for a
    /// specific requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_value: Option<JsonValue>,
}

/// One question within a survey.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyBlock {
    /// Question text.
    pub question: String,
    /// Question type.
    pub survey_type: SurveyType,
    /// Ordered options. Text blocks carry a single answer slot.
    pub answer: Vec<SurveyOption>,
}

/// One option of a submitted answer: the user's value in place of counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Display value (mirrors the survey option).
    pub value: String,
    /// The user's value; `None` means not selected / not answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_value: Option<JsonValue>,
}

/// One block of a submitted answer, mirroring the survey structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerBlock {
    /// Question text (mirrors the survey block).
    pub question: String,
    /// Question type (must agree with the survey block).
    pub survey_type: SurveyType,
    /// Ordered answer options, positionally matching the survey options.
    pub answer: Vec<AnswerOption>,
}

/// Input for one block when creating a survey.
pub struct CreateBlockInput {
    /// Question text.
    pub question: String,
    /// Question type.
    pub survey_type: SurveyType,
    /// Option display values. Choice blocks need at least two; text blocks
    /// take at most one (the answer slot label).
    pub options: Vec<String>,
}

/// Input for creating a survey.
pub struct CreateSurveyInput {
    /// Survey name.
    pub name: String,
    /// Optional cover image reference.
    pub image_url: Option<String>,
    /// Ordered question blocks.
    pub blocks: Vec<CreateBlockInput>,
}

/// Survey rendered for a caller.
#[derive(Clone, Debug, Serialize)]
pub struct SurveyView {
    /// Shared with the initiative the survey belongs to.
    pub id: Uuid,
    /// Survey name.
    pub name: String,
    /// Optional cover image reference.
    pub image_url: Option<String>,
    /// Ordered question blocks with aggregate stats.
    pub blocks: Vec<SurveyBlock>,
    /// Total number of users who have answered.
    pub vote_count: i32,
}

/// Survey service for business logic.
///
/// All operations assume an active transaction scope
/// ([`voices_db::scope::run`]).
#[derive(Clone)]
pub struct SurveyService {
    survey_repo: SurveyRepository,
    answer_repo: SurveyAnswerRepository,
    id_gen: IdGenerator,
}

impl Default for SurveyService {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyService {
    /// Create a new survey service.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            survey_repo: SurveyRepository::new(),
            answer_repo: SurveyAnswerRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a survey for an initiative.
    ///
    /// Creation is an upsert keyed by the initiative id: if a survey already
    /// exists for `survey_id`, it is returned unchanged instead of creating
    /// a duplicate document.
    pub async fn create_survey(
        &self,
        survey_id: Uuid,
        input: CreateSurveyInput,
    ) -> AppResult<SurveyView> {
        validate_create_input(&input)?;

        if let Some(existing) = self.survey_repo.find_by_id(survey_id).await? {
            tracing::debug!(survey_id = %survey_id, "survey already exists, returning it");
            let blocks = parse_survey_blocks(&existing.blocks)?;
            return Ok(view_of(&existing, blocks));
        }

        let blocks: Vec<SurveyBlock> = input
            .blocks
            .into_iter()
            .map(|block| {
                let options = if block.survey_type.is_choice() {
                    block.options
                } else {
                    // Text blocks carry exactly one answer slot.
                    vec![block.options.into_iter().next().unwrap_or_default()]
                };
                SurveyBlock {
                    question: block.question,
                    survey_type: block.survey_type,
                    answer: options
                        .into_iter()
                        .map(|value| SurveyOption {
                            value,
                            vote_count: 0,
                            vote_percent: 0,
                            user_value: None,
                        })
                        .collect(),
                }
            })
            .collect();

        let model = survey::ActiveModel {
            id: Set(survey_id),
            name: Set(input.name),
            image_url: Set(input.image_url),
            blocks: Set(to_json(&blocks)?),
            vote_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let created = self.survey_repo.create(model).await?;
        Ok(view_of(&created, blocks))
    }

    /// Get a survey, splicing in the requesting user's own answer when one
    /// exists.
    pub async fn get_survey(
        &self,
        survey_id: Uuid,
        user_id: Option<Uuid>,
    ) -> AppResult<SurveyView> {
        let model = self.survey_repo.get_by_id(survey_id).await?;
        let mut blocks = parse_survey_blocks(&model.blocks)?;

        if let Some(uid) = user_id
            && let Some(answer) = self.answer_repo.find_by_survey_and_user(survey_id, uid).await?
        {
            let answer_blocks = parse_answer_blocks(&answer.blocks)?;
            splice_user_values(&mut blocks, &answer_blocks);
        }

        Ok(view_of(&model, blocks))
    }

    /// Submit one user's answer to a survey.
    ///
    /// Fails with [`AppError::NotFound`] if the survey does not exist and
    /// [`AppError::AlreadyVoted`] if the user has answered before. The
    /// existence check is only an early exit; the unique index on
    /// (`survey_id`, `user_id`) is what guarantees at-most-one answer under
    /// concurrent submissions.
    pub async fn submit_vote(
        &self,
        survey_id: Uuid,
        user_id: Uuid,
        answer_blocks: Vec<AnswerBlock>,
    ) -> AppResult<SurveyView> {
        let model = self.survey_repo.get_by_id(survey_id).await?;

        if self.answer_repo.has_answered(survey_id, user_id).await? {
            return Err(AppError::AlreadyVoted);
        }

        let mut blocks = parse_survey_blocks(&model.blocks)?;
        validate_answer_shape(&blocks, &answer_blocks)?;

        let mut answer_blocks = answer_blocks;
        coerce_choose_one(&mut answer_blocks);

        // Increment the total before any percent computation so rounding is
        // always against the current total and division by zero is
        // impossible.
        let total_votes = model.vote_count + 1;
        apply_answer(&mut blocks, &answer_blocks, total_votes);

        // Answer first, survey second. The insert hits the unique index if a
        // concurrent submission won the race.
        let answer_model = survey_answer::ActiveModel {
            id: Set(self.id_gen.generate()),
            survey_id: Set(survey_id),
            user_id: Set(user_id),
            blocks: Set(to_json(&answer_blocks)?),
            created_at: Set(Utc::now().into()),
        };
        self.answer_repo.create(answer_model).await?;

        let mut active: survey::ActiveModel = model.into();
        active.blocks = Set(to_json(&blocks)?);
        active.vote_count = Set(total_votes);
        let updated = self.survey_repo.update(active).await?;

        tracing::debug!(survey_id = %survey_id, user_id = %user_id, total_votes, "vote recorded");

        // Re-fetch the caller's own answer and splice it into the view so the
        // response shows "what did I answer" beside the aggregate stats.
        let mut blocks = parse_survey_blocks(&updated.blocks)?;
        if let Some(stored) = self
            .answer_repo
            .find_by_survey_and_user(survey_id, user_id)
            .await?
        {
            let stored_blocks = parse_answer_blocks(&stored.blocks)?;
            splice_user_values(&mut blocks, &stored_blocks);
        }

        Ok(view_of(&updated, blocks))
    }

    /// Delete a survey and all of its answers (administrative escape hatch).
    pub async fn delete_survey(&self, survey_id: Uuid) -> AppResult<()> {
        // Surface NotFound before touching answers.
        self.survey_repo.get_by_id(survey_id).await?;

        let removed = self.answer_repo.delete_by_survey(survey_id).await?;
        self.survey_repo.delete(survey_id).await?;

        tracing::debug!(survey_id = %survey_id, removed_answers = removed, "survey deleted");
        Ok(())
    }
}

// === Tally logic ===

/// `round(count / total * 100)` as an integer percent.
fn round_percent(count: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (f64::from(count) / f64::from(total) * 100.0).round() as i32
}

/// Whether a submitted option value counts as "selected/answered".
fn is_selected(user_value: Option<&JsonValue>) -> bool {
    user_value.is_some_and(|v| !v.is_null())
}

/// JSON truthiness used when coercing choose-one values to booleans.
fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

/// Coerce submitted values on choose-one blocks to selected/not-selected
/// booleans before they are stored on the answer.
fn coerce_choose_one(answer_blocks: &mut [AnswerBlock]) {
    for block in answer_blocks {
        if block.survey_type != SurveyType::ChooseOne {
            continue;
        }
        for option in &mut block.answer {
            if let Some(value) = option.user_value.take() {
                if value.is_null() {
                    option.user_value = None;
                } else {
                    option.user_value = Some(JsonValue::Bool(truthy(&value)));
                }
            }
        }
    }
}

/// Validate that a submitted answer aligns with the survey structure.
///
/// Answers correspond to options by position, so block count, per-block
/// option count, and block types must all agree. A mismatch is a caught
/// validation error, never an out-of-range index.
fn validate_answer_shape(blocks: &[SurveyBlock], answer_blocks: &[AnswerBlock]) -> AppResult<()> {
    if answer_blocks.len() != blocks.len() {
        return Err(AppError::Validation(format!(
            "answer has {} blocks, survey has {}",
            answer_blocks.len(),
            blocks.len()
        )));
    }

    for (index, (block, answer)) in blocks.iter().zip(answer_blocks).enumerate() {
        if answer.survey_type != block.survey_type {
            return Err(AppError::Validation(format!(
                "block {index}: answer type does not match survey block type"
            )));
        }
        if answer.answer.len() != block.answer.len() {
            return Err(AppError::Validation(format!(
                "block {index}: answer has {} options, survey block has {}",
                answer.answer.len(),
                block.answer.len()
            )));
        }
        if block.survey_type == SurveyType::ChooseOne {
            let selected = answer
                .answer
                .iter()
                .filter(|o| is_selected(o.user_value.as_ref()))
                .count();
            if selected > 1 {
                return Err(AppError::Validation(format!(
                    "block {index}: choose-one block has {selected} selected options"
                )));
            }
        }
    }

    Ok(())
}

/// Apply one validated answer to the running tallies.
///
/// `total_votes` is the post-increment survey total. Selected options get
/// their counts bumped; percentages are then recomputed for every option of
/// every block against the new total, so the percent invariant holds for
/// unselected options too.
fn apply_answer(blocks: &mut [SurveyBlock], answer_blocks: &[AnswerBlock], total_votes: i32) {
    for (block, answer) in blocks.iter_mut().zip(answer_blocks) {
        for (option, submitted) in block.answer.iter_mut().zip(&answer.answer) {
            if is_selected(submitted.user_value.as_ref()) {
                option.vote_count += 1;
            }
        }
    }

    for block in blocks.iter_mut() {
        for option in &mut block.answer {
            option.vote_percent = round_percent(option.vote_count, total_votes);
        }
    }
}

/// Copy the user's values from a stored answer into the survey view, by
/// (block index, option index) correspondence.
fn splice_user_values(blocks: &mut [SurveyBlock], answer_blocks: &[AnswerBlock]) {
    for (block, answer) in blocks.iter_mut().zip(answer_blocks) {
        for (option, stored) in block.answer.iter_mut().zip(&answer.answer) {
            option.user_value.clone_from(&stored.user_value);
        }
    }
}

// === Validation & (de)serialization helpers ===

fn validate_create_input(input: &CreateSurveyInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Survey name cannot be empty".to_string()));
    }
    if input.name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Survey name is too long (max {MAX_NAME_LEN} chars)"
        )));
    }
    if input.blocks.is_empty() {
        return Err(AppError::Validation(
            "Survey must have at least 1 block".to_string(),
        ));
    }
    if input.blocks.len() > MAX_BLOCKS {
        return Err(AppError::Validation(format!(
            "Survey cannot have more than {MAX_BLOCKS} blocks"
        )));
    }

    for block in &input.blocks {
        if block.question.trim().is_empty() {
            return Err(AppError::Validation(
                "Block question cannot be empty".to_string(),
            ));
        }
        if block.question.len() > MAX_QUESTION_LEN {
            return Err(AppError::Validation(format!(
                "Block question is too long (max {MAX_QUESTION_LEN} chars)"
            )));
        }
        if block.survey_type.is_choice() {
            if block.options.len() < 2 {
                return Err(AppError::Validation(
                    "Choice block must have at least 2 options".to_string(),
                ));
            }
            if block.options.len() > MAX_CHOICE_OPTIONS {
                return Err(AppError::Validation(format!(
                    "Choice block cannot have more than {MAX_CHOICE_OPTIONS} options"
                )));
            }
            for option in &block.options {
                if option.trim().is_empty() {
                    return Err(AppError::Validation(
                        "Choice options cannot be empty".to_string(),
                    ));
                }
                if option.len() > MAX_OPTION_LEN {
                    return Err(AppError::Validation(format!(
                        "Choice option is too long (max {MAX_OPTION_LEN} chars)"
                    )));
                }
            }
        } else if block.options.len() > 1 {
            return Err(AppError::Validation(
                "Text block takes at most 1 answer slot".to_string(),
            ));
        }
    }

    Ok(())
}

fn parse_survey_blocks(value: &JsonValue) -> AppResult<Vec<SurveyBlock>> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Internal(format!("Invalid survey blocks: {e}")))
}

fn parse_answer_blocks(value: &JsonValue) -> AppResult<Vec<AnswerBlock>> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Internal(format!("Invalid answer blocks: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> AppResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

fn view_of(model: &survey::Model, blocks: Vec<SurveyBlock>) -> SurveyView {
    SurveyView {
        id: model.id,
        name: model.name.clone(),
        image_url: model.image_url.clone(),
        blocks,
        vote_count: model.vote_count,
    }
}
