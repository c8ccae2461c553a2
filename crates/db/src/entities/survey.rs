//! Survey entity for initiative polls.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey")]
pub struct Model {
    /// Shared with the initiative the survey belongs to.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Ordered question blocks (JSON array of blocks with options)
    #[sea_orm(column_type = "JsonBinary")]
    pub blocks: JsonValue,

    /// Total number of users who have answered
    pub vote_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::survey_answer::Entity")]
    SurveyAnswer,
}

impl Related<super::survey_answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyAnswer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
