//! Database entities.

pub mod survey;
pub mod survey_answer;

pub use survey::Entity as Survey;
pub use survey_answer::Entity as SurveyAnswer;
