//! Property-based tests for the response parser.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::core::fields::Field;
use crate::core::parser::{parse_response, ParseError};

fn arb_field() -> impl Strategy<Value = Field> {
    prop::sample::select(Field::ALL.to_vec())
}

/// Values including quotes, backslashes and newlines, which serde_json escapes.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?'\"\\\\\n-]{0,60}"
}

fn arb_bio() -> impl Strategy<Value = BTreeMap<Field, String>> {
    prop::collection::btree_map(arb_field(), arb_text(), 1..=7)
}

/// Fragments that steer input into the quote-repair strategies.
fn arb_fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "{", "}", ":", ",", " ", "\n", "\"", "\\", "\\\"", "'", "\\'", "x",
        "\"appearance\": ", "\"secrets\": \"", "\"catchphrase\": \"", "\"Catch_Phrase\":",
    ])
}

fn arb_messy_reply() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_fragment(), 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn valid_json_parses_unchanged(bio in arb_bio(), fenced in any::<bool>()) {
        let object: serde_json::Map<String, serde_json::Value> = bio
            .iter()
            .map(|(f, v)| (f.key().to_string(), serde_json::Value::String(v.clone())))
            .collect();
        let mut raw = serde_json::to_string_pretty(&object).unwrap();
        if fenced {
            raw = format!("```json\n{raw}\n```");
        }

        prop_assert_eq!(parse_response(&raw).unwrap(), bio);
    }

    #[test]
    fn failures_carry_raw_text(raw in "[a-z {}:,]{0,40}") {
        if let Err(ParseError::UnparseableResponse { raw: kept, last_error }) = parse_response(&raw) {
            prop_assert_eq!(kept, raw);
            prop_assert!(!last_error.is_empty());
        }
    }

    #[test]
    fn quote_heavy_input_never_panics(raw in "[a-z\"\\\\:{},' \n]{0,60}") {
        match parse_response(&raw) {
            Ok(_) => {}
            Err(ParseError::UnparseableResponse { raw: kept, .. }) => {
                prop_assert_eq!(kept, raw);
            }
        }
    }

    #[test]
    fn key_shaped_input_never_panics(raw in arb_messy_reply()) {
        match parse_response(&raw) {
            Ok(_) => {}
            Err(ParseError::UnparseableResponse { raw: kept, .. }) => {
                prop_assert_eq!(kept, raw);
            }
        }
    }
}
