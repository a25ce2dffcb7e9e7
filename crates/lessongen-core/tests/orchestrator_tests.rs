//! Orchestrator integration tests - batch lifecycle against scripted
//! collaborators

use lessongen_core::prelude::*;
use lessongen_core::GenerationError;
use lessongen_field::{Audience, Field, FieldId, FieldKind, FieldValue, QUESTION_SLOTS};
use lessongen_test_utils::{
    question_field, text_field, valid_question, FailingJudge, NamingJudge, TestHarness,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn orchestrator(harness: &TestHarness) -> GenerationOrchestrator {
    GenerationOrchestrator::new(
        harness.services(),
        harness.crosswalk(),
        OrchestratorConfig::new().with_grade_band_field(FieldId::new("grade_band")),
    )
}

fn static_field(id: &str, audience: Audience) -> Field {
    Field::new(id, id.to_uppercase(), FieldKind::PlainText, audience)
}

fn values(pairs: &[(&str, &str)]) -> HashMap<FieldId, FieldValue> {
    pairs
        .iter()
        .map(|(id, text)| (FieldId::new(*id), FieldValue::Text((*text).to_string())))
        .collect()
}

#[tokio::test]
async fn lookahead_pauses_with_union_of_missing_context() {
    let fields = vec![
        static_field("a", Audience::Designer),
        static_field("b", Audience::Designer),
        text_field("f1", Audience::Designer).with_context([FieldId::new("a")]),
        text_field("f2", Audience::Builder).with_context([FieldId::new("b")]),
    ];
    let harness = TestHarness::new(fields);
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    let state = orch.run(&mut batch).await.unwrap();

    assert_eq!(state, BatchState::Paused);
    let missing_ids: Vec<_> = batch.missing().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(missing_ids, vec!["a", "b"]);
    // Neither field was generated
    assert_eq!(harness.completion.text_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completed_batch_generates_designer_fields_first() {
    let fields = vec![
        text_field("built", Audience::Builder),
        text_field("designed", Audience::Designer),
    ];
    let harness = TestHarness::new(fields);
    harness.completion.push_text("designer output");
    harness.completion.push_text("builder output");
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    let state = orch.run(&mut batch).await.unwrap();

    assert_eq!(state, BatchState::Completed);
    assert_eq!(batch.index(), 0);
    assert_eq!(
        batch.value_of(&FieldId::new("designed")),
        Some(&FieldValue::Text("designer output".to_string()))
    );
    assert_eq!(
        batch.value_of(&FieldId::new("built")),
        Some(&FieldValue::Text("builder output".to_string()))
    );
}

#[tokio::test]
async fn autosave_snapshot_after_every_step() {
    let fields = vec![
        text_field("one", Audience::Designer),
        text_field("two", Audience::Designer),
    ];
    let harness = TestHarness::new(fields);
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    orch.run(&mut batch).await.unwrap();

    assert_eq!(harness.persistence.save_count(), 2);
    let snapshots = harness.persistence.snapshots.lock().unwrap();
    // First snapshot has only the first field, second has both
    assert_eq!(snapshots[0].len(), 1);
    assert_eq!(snapshots[1].len(), 2);
    assert!(batch.last_saved_at().is_some());
}

#[tokio::test]
async fn step_failure_pauses_at_failed_index_and_resumes_there() {
    let fields = vec![
        text_field("f0", Audience::Designer),
        text_field("f1", Audience::Designer),
        text_field("f2", Audience::Designer),
    ];
    let harness = TestHarness::new(fields);
    harness.completion.fail_text_call(3);
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    let err = orch.run(&mut batch).await.unwrap_err();

    assert!(matches!(err, GenerationError::Service { .. }));
    assert!(err.is_recoverable());
    assert_eq!(batch.state(), BatchState::Paused);
    assert_eq!(batch.index(), 2);
    assert!(batch.last_error().is_some());
    // The two committed steps were autosaved and retained
    assert_eq!(harness.persistence.save_count(), 2);

    // Resume: fields 0 and 1 are not re-generated
    let state = orch.run(&mut batch).await.unwrap();
    assert_eq!(state, BatchState::Completed);
    assert_eq!(harness.completion.text_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn cancellation_checked_between_steps() {
    let fields = vec![text_field("f0", Audience::Designer)];
    let harness = TestHarness::new(fields);
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    batch.cancel_flag().cancel();
    let state = orch.run(&mut batch).await.unwrap();

    assert_eq!(state, BatchState::Cancelled);
    assert_eq!(harness.completion.text_calls.load(Ordering::SeqCst), 0);

    // A cancelled batch cannot be re-run
    let err = orch.run(&mut batch).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::NotRunnable(BatchState::Cancelled)
    ));
}

#[tokio::test]
async fn question_set_end_to_end() {
    let fields = vec![
        static_field("grade_band", Audience::Designer),
        static_field("passage", Audience::Designer),
        question_field("quiz", &["passage"]),
    ];
    let harness = TestHarness::new(fields);
    for i in 0..QUESTION_SLOTS {
        harness
            .completion
            .push_question(valid_question(&format!("Question {i}"), &["CCSS.RL.9.1"]));
    }
    let orch = orchestrator(&harness);

    let initial = values(&[("grade_band", "9"), ("passage", "A long passage about heroes.")]);
    let mut batch = orch.new_batch("template", "lesson", initial).await.unwrap();
    let state = orch.run(&mut batch).await.unwrap();

    assert_eq!(state, BatchState::Completed);
    assert_eq!(
        harness.completion.question_calls.load(Ordering::SeqCst),
        QUESTION_SLOTS
    );

    let value = batch.value_of(&FieldId::new("quiz")).unwrap();
    let set = value.as_questions().unwrap();
    assert!(set.questions.iter().all(|q| !q.is_empty()));
    assert_eq!(set.sources.len(), QUESTION_SLOTS);

    // Echo judge keeps every candidate; the source code sits in its
    // canonical position
    let merged = &set.sources[&0].code;
    assert_eq!(
        merged,
        "CCSS.RL.9.1; TEKS.9.5.B; BEST.ELA.09.R.2.1; BLOOM.Analyze; 9.RL.1"
    );
    assert_eq!(set.sources[&0].statement, "Cite evidence, strong and thorough");
    assert!(set.filtered_out.is_empty());
}

#[tokio::test]
async fn question_set_records_filtered_out_codes() {
    let fields = vec![
        static_field("grade_band", Audience::Designer),
        static_field("passage", Audience::Designer),
        question_field("quiz", &["passage"]),
    ];
    let harness = TestHarness::new(fields)
        .with_judge(Arc::new(NamingJudge("only CCSS.RL.9.1 fits".to_string())));
    for _ in 0..QUESTION_SLOTS {
        harness
            .completion
            .push_question(valid_question("Q", &["TEKS.9.5.B"]));
    }
    let orch = orchestrator(&harness);

    let initial = values(&[("grade_band", "9"), ("passage", "Sample passage.")]);
    let mut batch = orch.new_batch("template", "lesson", initial).await.unwrap();
    orch.run(&mut batch).await.unwrap();

    let set = batch
        .value_of(&FieldId::new("quiz"))
        .and_then(FieldValue::as_questions)
        .unwrap()
        .clone();
    // Reverse lookup recovered the source 9.RL.1 behind TEKS.9.5.B
    assert_eq!(set.sources[&0].code, "CCSS.RL.9.1; 9.RL.1");
    let dropped = &set.filtered_out[&0];
    assert_eq!(
        dropped,
        &vec![
            "TEKS.9.5.B".to_string(),
            "BEST.ELA.09.R.2.1".to_string(),
            "BLOOM.Analyze".to_string()
        ]
    );
}

#[tokio::test]
async fn judge_outage_keeps_all_candidates() {
    let fields = vec![
        static_field("grade_band", Audience::Designer),
        static_field("passage", Audience::Designer),
        question_field("quiz", &["passage"]),
    ];
    let harness = TestHarness::new(fields).with_judge(Arc::new(FailingJudge));
    for _ in 0..QUESTION_SLOTS {
        harness
            .completion
            .push_question(valid_question("Q", &["CCSS.RL.9.1"]));
    }
    let orch = orchestrator(&harness);

    let initial = values(&[("grade_band", "9"), ("passage", "Sample passage.")]);
    let mut batch = orch.new_batch("template", "lesson", initial).await.unwrap();
    let state = orch.run(&mut batch).await.unwrap();

    // Filtering fails open; generation is never blocked
    assert_eq!(state, BatchState::Completed);
    let set = batch
        .value_of(&FieldId::new("quiz"))
        .and_then(FieldValue::as_questions)
        .unwrap()
        .clone();
    assert!(set.filtered_out.is_empty());
    assert_eq!(
        set.sources[&0].code,
        "CCSS.RL.9.1; TEKS.9.5.B; BEST.ELA.09.R.2.1; BLOOM.Analyze; 9.RL.1"
    );
}

#[tokio::test]
async fn malformed_question_aborts_field_and_pauses_batch() {
    let fields = vec![
        static_field("passage", Audience::Designer),
        question_field("quiz", &["passage"]),
    ];
    let harness = TestHarness::new(fields);
    let mut broken = valid_question("Q", &[]);
    broken.choice_b.clear();
    harness.completion.push_question(broken);
    let orch = orchestrator(&harness);

    let initial = values(&[("passage", "Sample passage.")]);
    let mut batch = orch.new_batch("template", "lesson", initial).await.unwrap();
    let err = orch.run(&mut batch).await.unwrap_err();

    match err {
        GenerationError::MalformedQuestion { slot, ref missing, .. } => {
            assert_eq!(slot, 0);
            assert_eq!(missing, &vec!["choice_b"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_recoverable());
    assert_eq!(batch.state(), BatchState::Paused);
    // No partial question set was stored
    assert!(batch.value_of(&FieldId::new("quiz")).is_none());
    assert_eq!(harness.persistence.save_count(), 0);
}

#[tokio::test]
async fn image_field_uploads_and_prefers_service_alt_text() {
    let fields = vec![
        static_field("passage", Audience::Designer),
        Field::new("hero", "Hero Image", FieldKind::Image, Audience::Builder)
            .generatable()
            .with_context([FieldId::new("passage")])
            .with_instructions("An illustration for the passage"),
    ];
    let harness = TestHarness::new(fields);
    let orch = orchestrator(&harness);

    let initial = values(&[("passage", "A tale of two rivers.")]);
    let mut batch = orch.new_batch("template", "lesson", initial).await.unwrap();
    orch.run(&mut batch).await.unwrap();

    // No service alt text: the caption service supplies it
    let value = batch.value_of(&FieldId::new("hero")).unwrap();
    let FieldValue::Image(image) = value else {
        panic!("expected image value");
    };
    assert!(image.url.starts_with("https://cdn.test/lessons/lesson/hero-"));
    assert_eq!(image.alt_text, "a scripted caption");
    assert_eq!(image.model_used, "test-image-model");
    assert_eq!(harness.caption.calls.load(Ordering::SeqCst), 1);

    let uploads = harness.storage.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].2, "image/png");
}

#[tokio::test]
async fn image_service_alt_text_skips_caption_call() {
    let fields = vec![Field::new("hero", "Hero Image", FieldKind::Image, Audience::Builder)
        .generatable()
        .with_instructions("An illustration")];
    let harness = TestHarness::new(fields);
    harness.image.set_alt_text("service alt");
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    orch.run(&mut batch).await.unwrap();

    let FieldValue::Image(image) = batch.value_of(&FieldId::new("hero")).unwrap() else {
        panic!("expected image value");
    };
    assert_eq!(image.alt_text, "service alt");
    assert_eq!(image.alt_text_model_used, "test-image-model");
    assert_eq!(harness.caption.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn autosave_failure_pauses_and_retains_committed_steps() {
    let fields = vec![text_field("f0", Audience::Designer)];
    let harness = TestHarness::new(fields);
    harness.persistence.fail_saves();
    let orch = orchestrator(&harness);

    let mut batch = orch
        .new_batch("template", "lesson", HashMap::new())
        .await
        .unwrap();
    let err = orch.run(&mut batch).await.unwrap_err();

    assert!(matches!(err, GenerationError::Autosave(_)));
    assert_eq!(batch.state(), BatchState::Paused);
    assert_eq!(batch.index(), 0);
    // The generated value itself is retained in the batch
    assert!(batch.value_of(&FieldId::new("f0")).is_some());
}
