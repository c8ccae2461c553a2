//! Business logic services.

pub mod survey;

pub use survey::SurveyService;
