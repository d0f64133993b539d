//! Generation Orchestrator Unit Tests
//!
//! Covers:
//! - Retry count and payload narrowing order
//! - Terminal (non-retryable) failures
//! - Per-operation latches
//! - No mutation of form or history on failure
//! - Portrait generation and reference handling

use std::sync::{Arc, Mutex};

use mockall::Sequence;

use crate::core::fields::Field;
use crate::core::form::{Portrait, Session, VisualState};
use crate::core::history::NavigationState;
use crate::core::llm::{BioRequest, LlmError, MockImageGenerator, MockTextGenerator};
use crate::core::orchestrator::{
    request_bio, GenerationError, ImageReference, Operation, Orchestrator,
};
use crate::core::parser::ParseError;
use crate::tests::common::{fast_policy, kaladin, TRUNCATED_BIO, VALID_BIO};

fn network_failure() -> LlmError {
    LlmError::NetworkFailure {
        status: Some(503),
        message: "upstream unavailable".to_string(),
    }
}

fn full_request() -> BioRequest {
    BioRequest::new("prompt")
        .with_reference_documents(vec!["file-rules".into(), "file-lore".into()])
        .with_knowledge_base("vs-setting")
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(fast_policy())
        .with_reference_documents(vec!["file-rules".into()])
        .with_knowledge_base("vs-setting")
}

// =============================================================================
// Retry Policy
// =============================================================================

#[tokio::test]
async fn test_retry_narrows_payload_each_attempt() {
    let seen: Arc<Mutex<Vec<BioRequest>>> = Arc::default();
    let mut client = MockTextGenerator::new();
    let mut seq = Sequence::new();

    for attempt in 0..3 {
        let seen = seen.clone();
        client
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |req| {
                seen.lock().unwrap().push(req.clone());
                if attempt < 2 {
                    Err(network_failure())
                } else {
                    Ok(VALID_BIO.to_string())
                }
            });
    }

    let text = request_bio(&client, &full_request(), fast_policy())
        .await
        .unwrap();
    assert_eq!(text, VALID_BIO);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].reference_documents.len(), 2);
    assert_eq!(seen[0].knowledge_base.as_deref(), Some("vs-setting"));

    assert!(seen[1].reference_documents.is_empty());
    assert_eq!(seen[1].knowledge_base.as_deref(), Some("vs-setting"));

    assert!(seen[2].reference_documents.is_empty());
    assert!(seen[2].knowledge_base.is_none());
    assert!(seen.iter().all(|r| r.prompt == "prompt"));
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .times(3)
        .returning(|_| Err(network_failure()));

    let err = request_bio(&client, &full_request(), fast_policy())
        .await
        .unwrap_err();
    assert_eq!(err, network_failure());
}

#[tokio::test]
async fn test_missing_credential_is_not_retried() {
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .times(1)
        .returning(|_| Err(LlmError::MissingCredential));

    let err = request_bio(&client, &full_request(), fast_policy())
        .await
        .unwrap_err();
    assert_eq!(err, LlmError::MissingCredential);
}

#[tokio::test]
async fn test_no_content_is_not_retried() {
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .times(1)
        .returning(|_| Err(LlmError::NoContent));

    assert_eq!(
        request_bio(&client, &full_request(), fast_policy()).await,
        Err(LlmError::NoContent)
    );
}

// =============================================================================
// Bio Generation
// =============================================================================

#[tokio::test]
async fn test_generate_bio_commits_every_field() {
    let mut session = Session::new(kaladin());
    session.form.on_direct_edit(Field::Background, "A simple farmer.");

    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .withf(|req| {
            req.prompt.contains("- Name: Kaladin")
                && req.prompt.contains("- background: A simple farmer.")
                && req.reference_documents == ["file-rules"]
        })
        .times(1)
        .returning(|_| Ok(VALID_BIO.to_string()));

    let mut orch = orchestrator();
    let updated = orch.generate_bio(&mut session, &client).await.unwrap();

    assert_eq!(updated.len(), Field::ALL.len());
    assert!(!orch.is_busy(Operation::Bio));
    for field in Field::ALL {
        assert_eq!(session.form.state(field), VisualState::Highlighted);
    }

    // Background had user text: [UserEdited, AiGenerated]; the rest [Blank, AiGenerated].
    assert_eq!(session.history.len(Field::Background).unwrap(), 2);
    assert_eq!(
        session.navigation(Field::Secrets),
        NavigationState {
            visible: true,
            can_go_previous: true,
            can_go_next: false,
            position: Some((2, 2)),
        }
    );
}

#[tokio::test]
async fn test_partial_response_only_touches_returned_fields() {
    let mut session = Session::new(kaladin());
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .returning(|_| Ok(r#"{"motivation": "Protect the bridge crew."}"#.to_string()));

    let updated = orchestrator()
        .generate_bio(&mut session, &client)
        .await
        .unwrap();

    assert_eq!(updated, vec![Field::Motivation]);
    assert_eq!(session.history.len(Field::Appearance).unwrap(), 0);
    assert_eq!(session.navigation(Field::Appearance), NavigationState::HIDDEN);
}

#[tokio::test]
async fn test_parse_failure_mutates_nothing() {
    let mut session = Session::new(kaladin());
    session.form.on_direct_edit(Field::Background, "A simple farmer.");
    let before = session.clone();

    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .returning(|_| Ok(TRUNCATED_BIO.to_string()));

    let mut orch = orchestrator();
    let err = orch.generate_bio(&mut session, &client).await.unwrap_err();

    match err {
        GenerationError::Parse(ParseError::UnparseableResponse { raw, .. }) => {
            assert_eq!(raw, TRUNCATED_BIO)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!orch.is_busy(Operation::Bio));
    for field in Field::ALL {
        assert_eq!(session.form.display(field), before.form.display(field));
        assert_eq!(session.history.len(field).unwrap(), 0);
    }
}

#[tokio::test]
async fn test_response_without_known_fields_is_no_content() {
    let mut session = Session::default();
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .returning(|_| Ok(r#"{"weapon": "spear"}"#.to_string()));

    let err = orchestrator()
        .generate_bio(&mut session, &client)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::NoContent);
    assert!(Field::ALL
        .iter()
        .all(|&f| session.history.len(f).unwrap() == 0));
}

#[tokio::test]
async fn test_network_failure_releases_latch() {
    let mut session = Session::default();
    let mut client = MockTextGenerator::new();
    client
        .expect_generate()
        .times(3)
        .returning(|_| Err(network_failure()));

    let mut orch = orchestrator();
    let err = orch.generate_bio(&mut session, &client).await.unwrap_err();

    assert!(matches!(err, GenerationError::Llm(LlmError::NetworkFailure { .. })));
    assert!(err.user_message().contains("Could not reach"));
    assert!(!orch.is_busy(Operation::Bio));
}

// =============================================================================
// Latches
// =============================================================================

#[test]
fn test_bio_latch_rejects_second_request() {
    let session = Session::default();
    let mut orch = orchestrator();

    let job = orch.begin_bio(&session).unwrap();
    assert_eq!(
        orch.begin_bio(&session).unwrap_err(),
        GenerationError::Busy(Operation::Bio)
    );

    // The image latch is independent.
    let image_job = orch.begin_image(&session, ImageReference::None).unwrap();
    assert!(orch.is_busy(Operation::Image));

    let mut session = session;
    let _ = orch.finish_bio(&mut session, job, Err(LlmError::NoContent));
    let _ = orch.finish_image(&mut session, image_job, Err(LlmError::NoContent));
    assert!(!orch.is_busy(Operation::Bio));
    assert!(!orch.is_busy(Operation::Image));
    assert!(orch.begin_bio(&session).is_ok());
}

#[test]
fn test_begin_bio_snapshots_every_tracked_field() {
    let mut session = Session::default();
    session.form.on_direct_edit(Field::Secrets, "Owes the Sons of Honor");

    let job = orchestrator().begin_bio(&session).unwrap();
    assert_eq!(job.originals.len(), Field::ALL.len());
    assert_eq!(job.originals[&Field::Secrets], "Owes the Sons of Honor");
    assert_eq!(job.originals[&Field::Appearance], "");
    assert_eq!(job.request.knowledge_base.as_deref(), Some("vs-setting"));
}

// =============================================================================
// Portraits
// =============================================================================

#[tokio::test]
async fn test_generate_image_replaces_portrait() {
    let mut session = Session::new(kaladin());
    session.form.on_direct_edit(Field::Appearance, "Dark curls.");

    let mut client = MockImageGenerator::new();
    client
        .expect_generate()
        .withf(|req| {
            req.prompt.contains("Alethi bridgeman")
                && req.prompt.contains("Dark curls.")
                && req.reference_image.is_none()
        })
        .times(1)
        .returning(|_| Ok(vec![0x89, b'P', b'N', b'G']));

    let mut orch = orchestrator();
    orch.generate_image(&mut session, &client, ImageReference::None)
        .await
        .unwrap();

    let portrait = session.form.portrait.as_ref().unwrap();
    assert_eq!(portrait.bytes, vec![0x89, b'P', b'N', b'G']);
    assert!(!orch.is_busy(Operation::Image));
    assert_eq!(session.history.len(Field::Appearance).unwrap(), 0);
}

#[tokio::test]
async fn test_refine_sends_current_portrait() {
    let mut session = Session::default();
    session.form.portrait = Some(Portrait {
        bytes: vec![1, 2, 3],
        prompt: "old".into(),
    });

    let mut client = MockImageGenerator::new();
    client
        .expect_generate()
        .withf(|req| req.reference_image.as_deref() == Some(&[1u8, 2, 3][..]))
        .times(1)
        .returning(|_| Ok(vec![4, 5, 6]));

    orchestrator()
        .generate_image(&mut session, &client, ImageReference::Current)
        .await
        .unwrap();
    assert_eq!(session.form.portrait.unwrap().bytes, vec![4, 5, 6]);
}

#[tokio::test]
async fn test_empty_image_keeps_old_portrait() {
    let mut session = Session::default();
    session.form.portrait = Some(Portrait {
        bytes: vec![7],
        prompt: "old".into(),
    });

    let mut client = MockImageGenerator::new();
    client.expect_generate().returning(|_| Ok(Vec::new()));

    let err = orchestrator()
        .generate_image(&mut session, &client, ImageReference::Upload(vec![9]))
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Llm(LlmError::NoContent));
    assert_eq!(session.form.portrait.unwrap().bytes, vec![7]);
}
