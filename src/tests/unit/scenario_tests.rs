//! End-to-end form scenarios: generation, direct edits and navigation
//! through the orchestrator with a scripted text generator.

use crate::core::fields::Field;
use crate::core::form::{Session, VisualState};
use crate::core::history::Provenance;
use crate::core::llm::MockTextGenerator;
use crate::core::orchestrator::Orchestrator;
use crate::tests::common::fast_policy;

fn replying(body: &'static str) -> MockTextGenerator {
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .times(1)
        .returning(move |_| Ok(body.to_string()));
    client
}

fn provenance_of(session: &Session, field: Field) -> Vec<(String, Provenance)> {
    session
        .history
        .history(field)
        .unwrap()
        .versions()
        .iter()
        .map(|v| (v.value.clone(), v.provenance))
        .collect()
}

#[tokio::test]
async fn test_background_user_text_then_ai_then_previous() {
    let mut session = Session::default();
    let mut orch = Orchestrator::new(fast_policy());
    session.form.on_direct_edit(Field::Background, "A simple farmer.");

    let client = replying(r#"{"background": "A storm-scarred orphan from the Shattered Plains."}"#);
    orch.generate_bio(&mut session, &client).await.unwrap();

    assert_eq!(
        provenance_of(&session, Field::Background),
        vec![
            ("A simple farmer.".to_string(), Provenance::UserEdited),
            (
                "A storm-scarred orphan from the Shattered Plains.".to_string(),
                Provenance::AiGenerated
            ),
        ]
    );
    assert_eq!(session.history.cursor(Field::Background).unwrap(), Some(1));
    assert_eq!(
        session.form.value(Field::Background),
        "A storm-scarred orphan from the Shattered Plains."
    );
    assert_eq!(session.form.state(Field::Background), VisualState::Highlighted);

    assert!(session.go_previous(Field::Background).unwrap());
    assert_eq!(session.form.value(Field::Background), "A simple farmer.");
    assert_eq!(session.form.state(Field::Background), VisualState::Neutral);
    assert_eq!(session.history.cursor(Field::Background).unwrap(), Some(0));
}

#[tokio::test]
async fn test_catchphrase_blank_then_two_rounds() {
    let mut session = Session::default();
    let mut orch = Orchestrator::new(fast_policy());

    let first = replying(r#"{"catchphrase": "Storms take you."}"#);
    orch.generate_bio(&mut session, &first).await.unwrap();
    assert_eq!(
        provenance_of(&session, Field::Catchphrase),
        vec![
            (String::new(), Provenance::Blank),
            ("Storms take you.".to_string(), Provenance::AiGenerated),
        ]
    );

    let second = replying(r#"{"catchphrase": "Storms take you!"}"#);
    orch.generate_bio(&mut session, &second).await.unwrap();
    let history = provenance_of(&session, Field::Catchphrase);
    assert_eq!(history.len(), 3);
    assert_eq!(
        history[2],
        ("Storms take you!".to_string(), Provenance::AiGenerated)
    );
    assert_eq!(session.history.cursor(Field::Catchphrase).unwrap(), Some(2));
}

#[tokio::test]
async fn test_same_ai_value_twice_adds_nothing() {
    let mut session = Session::default();
    let mut orch = Orchestrator::new(fast_policy());

    for _ in 0..2 {
        let client = replying(r#"{"secrets": "Hears the wind."}"#);
        orch.generate_bio(&mut session, &client).await.unwrap();
    }
    assert_eq!(session.history.len(Field::Secrets).unwrap(), 2);
}

#[tokio::test]
async fn test_edit_between_rounds_is_captured() {
    let mut session = Session::default();
    let mut orch = Orchestrator::new(fast_policy());

    orch.generate_bio(&mut session, &replying(r#"{"motivation": "Revenge."}"#))
        .await
        .unwrap();
    assert_eq!(
        session.form.on_direct_edit(Field::Motivation, "Revenge, then peace."),
        VisualState::Neutral
    );
    // Direct edits are not versions until the next generation.
    assert_eq!(session.history.len(Field::Motivation).unwrap(), 2);

    orch.generate_bio(&mut session, &replying(r#"{"motivation": "Peace."}"#))
        .await
        .unwrap();
    let history = provenance_of(&session, Field::Motivation);
    assert_eq!(history.len(), 4);
    assert_eq!(
        history[2],
        ("Revenge, then peace.".to_string(), Provenance::UserEdited)
    );

    // Step back over the edit and the first AI round.
    assert!(session.go_previous(Field::Motivation).unwrap());
    assert!(session.go_previous(Field::Motivation).unwrap());
    assert_eq!(session.form.value(Field::Motivation), "Revenge.");
    assert_eq!(session.form.state(Field::Motivation), VisualState::Highlighted);
}

#[tokio::test]
async fn test_navigating_back_then_generating_jumps_to_latest() {
    let mut session = Session::default();
    let mut orch = Orchestrator::new(fast_policy());

    orch.generate_bio(&mut session, &replying(r#"{"appearance": "Tall."}"#))
        .await
        .unwrap();
    session.go_previous(Field::Appearance).unwrap();
    assert_eq!(session.form.value(Field::Appearance), "");

    orch.generate_bio(&mut session, &replying(r#"{"appearance": "Tall, scarred."}"#))
        .await
        .unwrap();
    // The displayed blank equals no last version ("Tall."), so it is captured again.
    let history = provenance_of(&session, Field::Appearance);
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], (String::new(), Provenance::Blank));
    assert_eq!(session.history.cursor(Field::Appearance).unwrap(), Some(3));
    assert!(!session.navigation(Field::Appearance).can_go_next);
}
