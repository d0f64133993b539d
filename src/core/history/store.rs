use std::collections::BTreeMap;

use super::{HistoryError, Provenance, Result, Version};
use crate::core::fields::Field;

/// Version log and cursor for a single field.
#[derive(Debug, Clone, Default)]
pub struct FieldHistory {
    versions: Vec<Version>,
    cursor: Option<usize>,
}

impl FieldHistory {
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn last(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn current(&self) -> Option<&Version> {
        self.cursor.and_then(|i| self.versions.get(i))
    }

    /// Append unless the value equals the last recorded value.
    ///
    /// Returns whether a version was added. Only `value` is compared.
    fn push_distinct(&mut self, value: &str, provenance: Provenance) -> bool {
        if self.last().is_some_and(|last| last.value == value) {
            return false;
        }
        self.versions.push(Version::new(value, provenance));
        true
    }

    fn jump_to_last(&mut self) {
        self.cursor = self.versions.len().checked_sub(1);
    }

    pub(super) fn set_cursor(&mut self, index: usize) {
        debug_assert!(index < self.versions.len());
        self.cursor = Some(index);
    }
}

/// Session-scoped version history for a fixed set of fields.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    fields: BTreeMap<Field, FieldHistory>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(&Field::ALL)
    }
}

impl HistoryStore {
    /// Create an empty store tracking exactly `fields`.
    pub fn new(fields: &[Field]) -> Self {
        Self {
            fields: fields.iter().map(|&f| (f, FieldHistory::default())).collect(),
        }
    }

    /// Fields declared for this store.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.keys().copied()
    }

    pub fn tracks(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn history(&self, field: Field) -> Result<&FieldHistory> {
        self.fields
            .get(&field)
            .ok_or_else(|| HistoryError::UnknownField(field.key().to_string()))
    }

    pub(super) fn history_mut(&mut self, field: Field) -> Result<&mut FieldHistory> {
        self.fields
            .get_mut(&field)
            .ok_or_else(|| HistoryError::UnknownField(field.key().to_string()))
    }

    pub fn len(&self, field: Field) -> Result<usize> {
        Ok(self.history(field)?.len())
    }

    pub fn cursor(&self, field: Field) -> Result<Option<usize>> {
        Ok(self.history(field)?.cursor())
    }

    /// Record an AI generation for `field`.
    ///
    /// `original` is the value displayed before the AI ran, `ai_value` what
    /// the AI produced. The original is captured first (on first touch, or
    /// when it differs from the last version because the user edited the
    /// field directly), then the AI value unless it repeats the last version.
    /// The cursor always ends on the last version.
    pub fn record_generation(
        &mut self,
        field: Field,
        original: &str,
        ai_value: &str,
    ) -> Result<&Version> {
        let history = self.history_mut(field)?;

        if history.push_distinct(original, Provenance::of_user_value(original)) {
            log::debug!(
                "Captured pre-generation value for {} (version {})",
                field,
                history.len()
            );
        }

        if history.push_distinct(ai_value, Provenance::AiGenerated) {
            log::debug!("Recorded AI value for {} (version {})", field, history.len());
        } else {
            log::debug!("AI value for {} repeats the last version, skipped", field);
        }

        history.jump_to_last();
        history.current().ok_or(HistoryError::NotFound(field))
    }

    /// The version under the cursor.
    pub fn current_version(&self, field: Field) -> Result<&Version> {
        self.history(field)?
            .current()
            .ok_or(HistoryError::NotFound(field))
    }

    /// Drop every recorded version, keeping the declared field set.
    pub fn clear(&mut self) {
        for history in self.fields.values_mut() {
            *history = FieldHistory::default();
        }
    }
}
