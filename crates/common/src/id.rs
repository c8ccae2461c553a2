//! ID generation utilities.

use uuid::Uuid;

/// ID generator for entities.
///
/// Survey identifiers are shared with the initiative the survey belongs to,
/// so they are only ever generated once, by the initiative side. Everything
/// generated here (answer ids) uses plain UUIDs.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new random UUID v4.
    #[must_use]
    pub fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Generate a new UUID v7-based ID.
    ///
    /// UUID v7 is time-ordered and suitable for database primary keys.
    #[must_use]
    pub fn generate_v7(&self) -> Uuid {
        Uuid::now_v7()
    }
}
