//! Field Version History
//!
//! Per-field append-only version logs with a navigation cursor. Lives only for
//! the session; nothing here is persisted.

mod navigator;
mod store;

pub use navigator::NavigationState;
pub use store::{FieldHistory, HistoryStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fields::Field;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("No versions recorded for field: {0}")]
    NotFound(Field),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

// ============================================================================
// Data Models
// ============================================================================

/// Where a version's value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Empty default content
    Blank,
    /// Typed by the user
    UserEdited,
    /// Produced by the AI
    AiGenerated,
}

impl Provenance {
    /// Provenance of a value captured from the form.
    pub fn of_user_value(value: &str) -> Self {
        if value.trim().is_empty() {
            Provenance::Blank
        } else {
            Provenance::UserEdited
        }
    }
}

/// An immutable snapshot of a field's value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl Version {
    pub fn new(value: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            value: value.into(),
            created_at: Utc::now(),
            provenance,
        }
    }
}
