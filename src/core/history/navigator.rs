//! Prev/next stepping over a field's history.

use serde::Serialize;

use super::store::{FieldHistory, HistoryStore};
use super::{Result, Version};
use crate::core::fields::Field;

/// What the navigation row for a field should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    /// False when the field has 0 or 1 versions; the row is hidden entirely.
    pub visible: bool,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    /// 1-indexed `(position, total)`, only when visible.
    pub position: Option<(usize, usize)>,
}

impl NavigationState {
    pub const HIDDEN: NavigationState = NavigationState {
        visible: false,
        can_go_previous: false,
        can_go_next: false,
        position: None,
    };
}

impl FieldHistory {
    pub fn can_go_previous(&self) -> bool {
        self.cursor().is_some_and(|c| c > 0)
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor().is_some_and(|c| c + 1 < self.len())
    }

    pub fn navigation(&self) -> NavigationState {
        match self.cursor() {
            Some(cursor) if self.len() > 1 => NavigationState {
                visible: true,
                can_go_previous: self.can_go_previous(),
                can_go_next: self.can_go_next(),
                position: Some((cursor + 1, self.len())),
            },
            _ => NavigationState::HIDDEN,
        }
    }
}

impl HistoryStore {
    pub fn can_go_previous(&self, field: Field) -> Result<bool> {
        Ok(self.history(field)?.can_go_previous())
    }

    pub fn can_go_next(&self, field: Field) -> Result<bool> {
        Ok(self.history(field)?.can_go_next())
    }

    pub fn navigation(&self, field: Field) -> Result<NavigationState> {
        Ok(self.history(field)?.navigation())
    }

    /// Step the cursor back one version.
    ///
    /// Returns the newly current version, or `None` when already at the first
    /// version (or the history is empty).
    pub fn go_previous(&mut self, field: Field) -> Result<Option<&Version>> {
        let history = self.history_mut(field)?;
        match history.cursor() {
            Some(cursor) if cursor > 0 => {
                history.set_cursor(cursor - 1);
                Ok(history.current())
            }
            _ => Ok(None),
        }
    }

    /// Step the cursor forward one version. `None` at the last version.
    pub fn go_next(&mut self, field: Field) -> Result<Option<&Version>> {
        let history = self.history_mut(field)?;
        match history.cursor() {
            Some(cursor) if cursor + 1 < history.len() => {
                history.set_cursor(cursor + 1);
                Ok(history.current())
            }
            _ => Ok(None),
        }
    }
}
