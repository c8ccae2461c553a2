//! Core business logic for voices.

pub mod services;

pub use services::*;
