//! Character Fields
//!
//! The closed set of narrative bio fields that participate in version history,
//! plus the plain input attributes that only feed prompts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::history::HistoryError;

// ============================================================================
// Bio Fields
// ============================================================================

/// A narrative bio field produced (or refined) by the AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Appearance,
    Personality,
    Background,
    Motivation,
    Secrets,
    Catchphrase,
    Relationships,
}

impl Field {
    /// Every field, in display and export order.
    pub const ALL: [Field; 7] = [
        Field::Appearance,
        Field::Personality,
        Field::Background,
        Field::Motivation,
        Field::Secrets,
        Field::Catchphrase,
        Field::Relationships,
    ];

    /// Stable key used in prompts and AI responses.
    pub fn key(self) -> &'static str {
        match self {
            Field::Appearance => "appearance",
            Field::Personality => "personality",
            Field::Background => "background",
            Field::Motivation => "motivation",
            Field::Secrets => "secrets",
            Field::Catchphrase => "catchphrase",
            Field::Relationships => "relationships",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Appearance => "Appearance",
            Field::Personality => "Personality",
            Field::Background => "Background",
            Field::Motivation => "Motivation",
            Field::Secrets => "Secrets",
            Field::Catchphrase => "Catchphrase",
            Field::Relationships => "Relationships",
        }
    }

    /// Short guidance handed to the model for each field.
    pub fn guidance(self) -> &'static str {
        match self {
            Field::Appearance => "physical description, clothing and notable features",
            Field::Personality => "temperament, habits and how others perceive them",
            Field::Background => "upbringing and the events that shaped them",
            Field::Motivation => "what drives them and what they want right now",
            Field::Secrets => "something they hide, and from whom",
            Field::Catchphrase => "one short line they are known to say",
            Field::Relationships => "allies, rivals and family ties",
        }
    }

    /// Lenient key lookup used when reading AI output.
    ///
    /// Case-insensitive; `_`, `-` and spaces are ignored, and a handful of
    /// singular/plural spellings are accepted.
    pub fn from_loose_key(key: &str) -> Option<Field> {
        let normalized: String = key
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "appearance" | "looks" => Some(Field::Appearance),
            "personality" => Some(Field::Personality),
            "background" | "backstory" => Some(Field::Background),
            "motivation" | "motivations" => Some(Field::Motivation),
            "secrets" | "secret" => Some(Field::Secrets),
            "catchphrase" => Some(Field::Catchphrase),
            "relationships" | "relationship" => Some(Field::Relationships),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = HistoryError;

    /// Strict lookup by stable key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s)
            .ok_or_else(|| HistoryError::UnknownField(s.to_string()))
    }
}

// ============================================================================
// Input Attributes
// ============================================================================

/// A plain input attribute of the character sheet (not history-tracked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Name,
    Ancestry,
    Profession,
    Homeland,
    Age,
    Tone,
    Notes,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Name,
        Attribute::Ancestry,
        Attribute::Profession,
        Attribute::Homeland,
        Attribute::Age,
        Attribute::Tone,
        Attribute::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Attribute::Name => "Name",
            Attribute::Ancestry => "Ancestry",
            Attribute::Profession => "Profession",
            Attribute::Homeland => "Homeland",
            Attribute::Age => "Age",
            Attribute::Tone => "Tone",
            Attribute::Notes => "Notes",
        }
    }
}

/// Input attributes collected by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub ancestry: String,
    pub profession: String,
    pub homeland: String,
    pub age: String,
    /// Desired narrative tone ("grim", "heroic", ...).
    pub tone: String,
    /// Free-form inspiration for the model.
    pub notes: String,
}

impl CharacterSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, attr: Attribute) -> &str {
        match attr {
            Attribute::Name => &self.name,
            Attribute::Ancestry => &self.ancestry,
            Attribute::Profession => &self.profession,
            Attribute::Homeland => &self.homeland,
            Attribute::Age => &self.age,
            Attribute::Tone => &self.tone,
            Attribute::Notes => &self.notes,
        }
    }

    pub fn set(&mut self, attr: Attribute, value: impl Into<String>) {
        let value = value.into();
        match attr {
            Attribute::Name => self.name = value,
            Attribute::Ancestry => self.ancestry = value,
            Attribute::Profession => self.profession = value,
            Attribute::Homeland => self.homeland = value,
            Attribute::Age => self.age = value,
            Attribute::Tone => self.tone = value,
            Attribute::Notes => self.notes = value,
        }
    }

    /// Name for titles, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            "Unnamed Character"
        } else {
            trimmed
        }
    }

    /// Non-empty attributes as `(label, value)` pairs.
    pub fn filled(&self) -> Vec<(&'static str, &str)> {
        Attribute::ALL
            .iter()
            .map(|&a| (a.label(), self.get(a).trim()))
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }
}
