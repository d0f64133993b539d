//! Character Form and Session State
//!
//! The form holds what is currently displayed for each field, independent of
//! the field's history. The [`Session`] owns form and history together for
//! the lifetime of one run.

use std::collections::BTreeMap;

use serde::Serialize;

use super::fields::{CharacterSheet, Field};
use super::history::{HistoryStore, NavigationState, Provenance, Result, Version};

// ============================================================================
// Display State
// ============================================================================

/// How a field is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VisualState {
    #[default]
    Neutral,
    /// Content came from the AI and has not been touched since.
    Highlighted,
}

impl From<Provenance> for VisualState {
    fn from(provenance: Provenance) -> Self {
        match provenance {
            Provenance::AiGenerated => VisualState::Highlighted,
            Provenance::Blank | Provenance::UserEdited => VisualState::Neutral,
        }
    }
}

/// Current value and display state of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldDisplay {
    pub value: String,
    pub state: VisualState,
}

/// Generated portrait image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portrait {
    pub bytes: Vec<u8>,
    pub prompt: String,
}

// ============================================================================
// Form
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CharacterForm {
    pub sheet: CharacterSheet,
    displays: BTreeMap<Field, FieldDisplay>,
    pub portrait: Option<Portrait>,
}

impl CharacterForm {
    pub fn new(sheet: CharacterSheet) -> Self {
        Self {
            sheet,
            ..Default::default()
        }
    }

    pub fn display(&self, field: Field) -> FieldDisplay {
        self.displays.get(&field).cloned().unwrap_or_default()
    }

    pub fn value(&self, field: Field) -> &str {
        self.displays.get(&field).map(|d| d.value.as_str()).unwrap_or("")
    }

    pub fn state(&self, field: Field) -> VisualState {
        self.displays.get(&field).map(|d| d.state).unwrap_or_default()
    }

    /// Apply a direct user edit.
    ///
    /// The field drops to [`VisualState::Neutral`] immediately. No history
    /// entry is created; the edit is captured on the next generation.
    pub fn on_direct_edit(&mut self, field: Field, value: impl Into<String>) -> VisualState {
        let display = self.displays.entry(field).or_default();
        display.value = value.into();
        display.state = VisualState::Neutral;
        display.state
    }

    /// Show a recorded version: its value, and the state its provenance implies.
    pub fn show_version(&mut self, field: Field, version: &Version) {
        self.displays.insert(
            field,
            FieldDisplay {
                value: version.value.clone(),
                state: version.provenance.into(),
            },
        );
    }

    /// Current value of every field in `fields`.
    pub fn snapshot(&self, fields: impl IntoIterator<Item = Field>) -> BTreeMap<Field, String> {
        fields
            .into_iter()
            .map(|f| (f, self.value(f).to_string()))
            .collect()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Form plus history, created once at startup and owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub form: CharacterForm,
    pub history: HistoryStore,
}

impl Session {
    pub fn new(sheet: CharacterSheet) -> Self {
        Self {
            form: CharacterForm::new(sheet),
            history: HistoryStore::default(),
        }
    }

    /// Record a generation and push the resulting current version into the form.
    pub fn commit_generation(&mut self, field: Field, original: &str, ai_value: &str) -> Result<()> {
        let current = self.history.record_generation(field, original, ai_value)?;
        self.form.show_version(field, current);
        Ok(())
    }

    /// Step back one version; returns whether the display changed.
    pub fn go_previous(&mut self, field: Field) -> Result<bool> {
        match self.history.go_previous(field)? {
            Some(version) => {
                self.form.show_version(field, version);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Step forward one version; returns whether the display changed.
    pub fn go_next(&mut self, field: Field) -> Result<bool> {
        match self.history.go_next(field)? {
            Some(version) => {
                self.form.show_version(field, version);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn navigation(&self, field: Field) -> NavigationState {
        self.history
            .navigation(field)
            .unwrap_or(NavigationState::HIDDEN)
    }

    /// Start over with a blank character; history is discarded.
    pub fn reset(&mut self) {
        self.form = CharacterForm::default();
        self.history.clear();
    }
}
