//! Database repositories.
//!
//! Repositories are stateless: every method resolves its connection from the
//! ambient transaction scope ([`crate::scope`]) instead of holding one, so a
//! repository call outside an active scope fails fast.

pub mod survey;
pub mod survey_answer;

pub use survey::SurveyRepository;
pub use survey_answer::SurveyAnswerRepository;
