//! Property-based tests for export pagination.

use proptest::prelude::*;

use crate::core::export::{render, ExportOptions};
use crate::core::fields::{CharacterSheet, Field};
use crate::core::form::CharacterForm;

fn arb_form() -> impl Strategy<Value = CharacterForm> {
    prop::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,80}", Field::ALL.len()).prop_map(
        |values| {
            let mut form = CharacterForm::new(CharacterSheet::new("Lift"));
            for (field, value) in Field::ALL.iter().zip(values) {
                form.on_direct_edit(*field, value);
            }
            form
        },
    )
}

proptest! {
    #[test]
    fn pages_respect_size_and_width(
        form in arb_form(),
        line_width in 20usize..100,
        lines_per_page in 8usize..60,
    ) {
        let options = ExportOptions { line_width, lines_per_page };
        let doc = render(&form.sheet, &form, &options).unwrap();

        prop_assert!(doc.page_count() >= 1);
        for page in &doc.pages {
            prop_assert!(!page.is_empty());
            prop_assert!(page.len() <= lines_per_page - 2);
            prop_assert!(page.iter().all(|l| l.chars().count() <= line_width));
        }

        let markdown = doc.to_markdown();
        let last_footer = format!("*Page {0}/{0}*", doc.page_count());
        prop_assert!(markdown.trim_end().ends_with(&last_footer));
    }

    #[test]
    fn every_non_empty_field_gets_a_section(form in arb_form()) {
        let doc = render(&form.sheet, &form, &ExportOptions::default()).unwrap();
        let text = doc.to_markdown();
        for field in Field::ALL {
            let heading = format!("## {}", field.label());
            prop_assert!(text.contains(&heading));
        }
    }
}
