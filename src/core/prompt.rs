//! Prompt composition for bio and portrait requests.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::fields::{CharacterSheet, Field};

/// Build the bio prompt.
///
/// `current` holds the displayed value of each requested field; non-empty
/// values are handed to the model as drafts to refine rather than replace.
pub fn bio_prompt(sheet: &CharacterSheet, current: &BTreeMap<Field, String>) -> String {
    let mut prompt = String::from(
        "You are writing a tabletop RPG character bio. Use the attributes below \
         and any material from the attached reference documents.\n\n",
    );

    prompt.push_str("## Attributes\n");
    let filled = sheet.filled();
    if filled.is_empty() {
        prompt.push_str("(none given, invent freely)\n");
    }
    for (label, value) in filled {
        let _ = writeln!(prompt, "- {label}: {value}");
    }

    let drafts: Vec<_> = current
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .collect();
    if !drafts.is_empty() {
        prompt.push_str("\n## Existing drafts (keep their facts, improve the prose)\n");
        for (field, value) in drafts {
            let _ = writeln!(prompt, "- {}: {}", field.key(), value.trim());
        }
    }

    prompt.push_str("\n## Output\nRespond with a single JSON object and nothing else. Keys:\n");
    for field in current.keys() {
        let _ = writeln!(prompt, "- \"{}\": {}", field.key(), field.guidance());
    }
    prompt.push_str(
        "All values are plain strings. Use single quotes for any dialogue inside a value.\n",
    );

    prompt
}

/// Build the portrait prompt from the attributes and the current appearance.
pub fn portrait_prompt(sheet: &CharacterSheet, appearance: &str) -> String {
    let mut prompt = String::from("Painted fantasy character portrait, head and shoulders");

    let descriptors: Vec<&str> = [sheet.ancestry.trim(), sheet.profession.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if !descriptors.is_empty() {
        let _ = write!(prompt, " of a {}", descriptors.join(" "));
    }
    if !sheet.homeland.trim().is_empty() {
        let _ = write!(prompt, " from {}", sheet.homeland.trim());
    }
    prompt.push('.');

    if !appearance.trim().is_empty() {
        let _ = write!(prompt, " {}", appearance.trim());
    }
    if !sheet.tone.trim().is_empty() {
        let _ = write!(prompt, " Mood: {}.", sheet.tone.trim());
    }
    prompt.push_str(" No text or lettering.");
    prompt
}
