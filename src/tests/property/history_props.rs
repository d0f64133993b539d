//! Property-based tests for the field history store and navigator.

use proptest::prelude::*;

use crate::core::fields::Field;
use crate::core::history::HistoryStore;

// ============================================================================
// Strategies
// ============================================================================

/// Short values from a small alphabet so repeats are common.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[ab]{1,2}"]
}

/// (original, ai) pairs for a run of generations.
fn arb_rounds() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_value(), arb_value()), 1..20)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Previous,
    Next,
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(prop_oneof![Just(Step::Previous), Just(Step::Next)], 0..30)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn no_consecutive_duplicates(rounds in arb_rounds()) {
        let mut store = HistoryStore::default();
        for (original, ai) in &rounds {
            store.record_generation(Field::Secrets, original, ai).unwrap();
        }

        let versions = store.history(Field::Secrets).unwrap().versions();
        for pair in versions.windows(2) {
            prop_assert_ne!(&pair[0].value, &pair[1].value);
        }
    }

    #[test]
    fn generation_ends_on_ai_value(rounds in arb_rounds()) {
        let mut store = HistoryStore::default();
        for (original, ai) in &rounds {
            let current = store.record_generation(Field::Appearance, original, ai).unwrap();
            prop_assert_eq!(&current.value, ai);

            let history = store.history(Field::Appearance).unwrap();
            prop_assert_eq!(history.cursor(), Some(history.len() - 1));
        }
    }

    #[test]
    fn history_grows_by_at_most_two(rounds in arb_rounds()) {
        let mut store = HistoryStore::default();
        let mut previous = 0;
        for (original, ai) in &rounds {
            store.record_generation(Field::Motivation, original, ai).unwrap();
            let len = store.len(Field::Motivation).unwrap();
            prop_assert!(len >= previous && len <= previous + 2);
            previous = len;
        }
    }

    #[test]
    fn regeneration_with_same_values_is_idempotent(original in arb_value(), ai in arb_value()) {
        let mut store = HistoryStore::default();
        store.record_generation(Field::Catchphrase, &original, &ai).unwrap();
        let len = store.len(Field::Catchphrase).unwrap();

        // Second round starts from the displayed AI value.
        store.record_generation(Field::Catchphrase, &ai, &ai).unwrap();
        prop_assert_eq!(store.len(Field::Catchphrase).unwrap(), len);
    }

    #[test]
    fn navigation_stays_in_bounds(rounds in arb_rounds(), steps in arb_steps()) {
        let mut store = HistoryStore::default();
        for (original, ai) in &rounds {
            store.record_generation(Field::Background, original, ai).unwrap();
        }
        let len = store.len(Field::Background).unwrap();

        for step in steps {
            let before = store.cursor(Field::Background).unwrap().unwrap();
            let moved = match step {
                Step::Previous => store.go_previous(Field::Background).unwrap().is_some(),
                Step::Next => store.go_next(Field::Background).unwrap().is_some(),
            };
            let after = store.cursor(Field::Background).unwrap().unwrap();

            prop_assert!(after < len);
            match (step, moved) {
                (Step::Previous, true) => prop_assert_eq!(after + 1, before),
                (Step::Next, true) => prop_assert_eq!(after, before + 1),
                (_, false) => prop_assert_eq!(after, before),
            }

            let nav = store.navigation(Field::Background).unwrap();
            prop_assert_eq!(nav.visible, len > 1);
            prop_assert_eq!(nav.can_go_previous, len > 1 && after > 0);
            prop_assert_eq!(nav.can_go_next, len > 1 && after + 1 < len);
        }
    }
}
