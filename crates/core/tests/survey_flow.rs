//! End-to-end survey flows: service + repositories running inside a
//! transaction scope, against a mocked database.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::json;
use uuid::Uuid;
use voices_common::AppError;
use voices_core::services::survey::{
    AnswerBlock, CreateBlockInput, CreateSurveyInput, SurveyService, SurveyType,
};
use voices_db::{entities::survey, entities::survey_answer, scope};

fn survey_before_vote(id: Uuid) -> survey::Model {
    survey::Model {
        id,
        name: "Most beautiful village".to_string(),
        image_url: Some("https://files.example/survey.png".to_string()),
        blocks: json!([{
            "question": "Pick one",
            "survey_type": "choose_one",
            "answer": [
                { "value": "Yes", "vote_count": 0, "vote_percent": 0 },
                { "value": "No", "vote_count": 0, "vote_percent": 0 },
            ],
        }]),
        vote_count: 0,
        created_at: Utc::now().into(),
    }
}

fn survey_after_vote(id: Uuid) -> survey::Model {
    survey::Model {
        blocks: json!([{
            "question": "Pick one",
            "survey_type": "choose_one",
            "answer": [
                { "value": "Yes", "vote_count": 1, "vote_percent": 100 },
                { "value": "No", "vote_count": 0, "vote_percent": 0 },
            ],
        }]),
        vote_count: 1,
        ..survey_before_vote(id)
    }
}

fn stored_answer(survey_id: Uuid, user_id: Uuid) -> survey_answer::Model {
    survey_answer::Model {
        id: Uuid::new_v4(),
        survey_id,
        user_id,
        blocks: json!([{
            "question": "Pick one",
            "survey_type": "choose_one",
            "answer": [
                { "value": "Yes", "user_value": true },
                { "value": "No" },
            ],
        }]),
        created_at: Utc::now().into(),
    }
}

fn answer_blocks() -> Vec<AnswerBlock> {
    serde_json::from_value(json!([{
        "question": "Pick one",
        "survey_type": "choose_one",
        "answer": [
            { "value": "Yes", "user_value": "Yes" },
            { "value": "No" },
        ],
    }]))
    .unwrap()
}

#[tokio::test]
async fn submit_vote_happy_path_updates_counts_and_splices_user_values() {
    let survey_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // 1. load survey
        .append_query_results([[survey_before_vote(survey_id)]])
        // 2. already-voted count check
        .append_query_results([[maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(0))
        }]])
        // 3. insert answer (RETURNING)
        .append_query_results([[stored_answer(survey_id, user_id)]])
        // 4. update survey (RETURNING)
        .append_query_results([[survey_after_vote(survey_id)]])
        // 5. re-fetch the caller's own answer for splicing
        .append_query_results([[stored_answer(survey_id, user_id)]])
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();

    let service = SurveyService::new();
    let view = scope::run(&db, async {
        service.submit_vote(survey_id, user_id, answer_blocks()).await
    })
    .await
    .unwrap();

    assert_eq!(view.id, survey_id);
    assert_eq!(view.vote_count, 1);

    let block = &view.blocks[0];
    assert_eq!(block.answer[0].vote_count, 1);
    assert_eq!(block.answer[0].vote_percent, 100);
    assert_eq!(block.answer[1].vote_count, 0);
    assert_eq!(block.answer[1].vote_percent, 0);

    // The caller's own answer is spliced in positionally, coerced to bool.
    assert_eq!(block.answer[0].user_value, Some(json!(true)));
    assert_eq!(block.answer[1].user_value, None);
}

#[tokio::test]
async fn submit_vote_fails_for_missing_survey() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<survey::Model>::new()])
        .into_connection();

    let service = SurveyService::new();
    let result = scope::run(&db, async {
        service
            .submit_vote(Uuid::new_v4(), Uuid::new_v4(), answer_blocks())
            .await
    })
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn submit_vote_short_circuits_when_already_voted() {
    let survey_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[survey_before_vote(survey_id)]])
        .append_query_results([[maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(1))
        }]])
        .into_connection();

    let service = SurveyService::new();
    let result = scope::run(&db, async {
        service
            .submit_vote(survey_id, Uuid::new_v4(), answer_blocks())
            .await
    })
    .await;

    assert!(matches!(result, Err(AppError::AlreadyVoted)));
}

#[tokio::test]
async fn create_survey_is_an_upsert_by_initiative_id() {
    let survey_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[survey_before_vote(survey_id)]])
        .into_connection();

    let service = SurveyService::new();
    let view = scope::run(&db, async {
        service
            .create_survey(
                survey_id,
                CreateSurveyInput {
                    name: "Most beautiful village".to_string(),
                    image_url: None,
                    blocks: vec![CreateBlockInput {
                        question: "Pick one".to_string(),
                        survey_type: SurveyType::ChooseOne,
                        options: vec!["Yes".to_string(), "No".to_string()],
                    }],
                },
            )
            .await
    })
    .await
    .unwrap();

    // The existing survey is returned unchanged; no duplicate is created.
    assert_eq!(view.id, survey_id);
    assert_eq!(view.name, "Most beautiful village");
    assert_eq!(view.vote_count, 0);
}

#[tokio::test]
async fn delete_survey_removes_answers_then_survey() {
    let survey_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[survey_before_vote(survey_id)]])
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();

    let service = SurveyService::new();
    scope::run(&db, async { service.delete_survey(survey_id).await })
        .await
        .unwrap();
}

#[tokio::test]
async fn get_survey_splices_prior_answer_for_requester() {
    let survey_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[survey_after_vote(survey_id)]])
        .append_query_results([[stored_answer(survey_id, user_id)]])
        .into_connection();

    let service = SurveyService::new();
    let view = scope::run(&db, async {
        service.get_survey(survey_id, Some(user_id)).await
    })
    .await
    .unwrap();

    assert_eq!(view.blocks[0].answer[0].user_value, Some(json!(true)));
    assert_eq!(view.blocks[0].answer[0].vote_percent, 100);
}
