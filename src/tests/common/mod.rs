//! Common Test Utilities
//!
//! Fixtures shared across unit and property tests.

use std::time::Duration;

use crate::config::AiConfig;
use crate::core::fields::{Attribute, CharacterSheet};
use crate::core::orchestrator::RetryPolicy;

/// A sheet with every attribute filled.
pub fn kaladin() -> CharacterSheet {
    let mut sheet = CharacterSheet::new("Kaladin");
    sheet.set(Attribute::Ancestry, "Alethi");
    sheet.set(Attribute::Profession, "bridgeman");
    sheet.set(Attribute::Homeland, "Hearthstone");
    sheet.set(Attribute::Age, "19");
    sheet.set(Attribute::Tone, "grim but hopeful");
    sheet.set(Attribute::Notes, "Former surgeon's apprentice");
    sheet
}

/// Three attempts with no delay between them.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
    }
}

/// Client config pointed at a mock server.
pub fn ai_config(base_url: &str) -> AiConfig {
    AiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..AiConfig::default()
    }
}

/// A complete, valid bio response.
pub const VALID_BIO: &str = r#"{
  "appearance": "Dark curls, a slave brand on his forehead.",
  "personality": "Protective to a fault.",
  "background": "A storm-scarred orphan from the Shattered Plains.",
  "motivation": "Keep his men alive.",
  "secrets": "Hears a voice on the wind.",
  "catchphrase": "Life before death.",
  "relationships": "Brother: Tien (deceased)"
}"#;

/// A bio whose catchphrase carries over-escaped dialogue quotes.
pub const OVER_ESCAPED_BIO: &str = r#"{
  "background": "Raised in Hearthstone.",
  "catchphrase": "He always says \\"Journey before destination.\\""
}"#;

/// Truncated mid-object.
pub const TRUNCATED_BIO: &str = r#"{"appearance": "Tall", "background": "Born in"#;
