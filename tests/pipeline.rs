//! Orchestration-core integration tests

use michi_gateway::knowledge::KnowledgeCandidate;
use michi_gateway::{Error, Intent};

mod common;
use common::{build_harness, valid_speech_bytes, wait_for, HarnessOptions};

fn candidate(content: &str, score: f32) -> KnowledgeCandidate {
    KnowledgeCandidate {
        content: content.to_string(),
        score,
    }
}

#[tokio::test]
async fn oversized_payload_rejected_before_transcription() {
    let harness = build_harness(HarnessOptions {
        max_audio_bytes: 100,
        ..HarnessOptions::default()
    });

    let audio = vec![0_u8; 500];
    let err = harness
        .pipeline
        .process_audio("robot-1", &audio)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PayloadTooLarge { .. }));
    assert_eq!(harness.transcriber.call_count(), 0);
}

#[tokio::test]
async fn talk_turn_produces_response_and_artifact() {
    let harness = build_harness(HarnessOptions::default());

    let outcome = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Talk);
    assert_eq!(
        outcome.response.as_deref(),
        Some("Soekarno adalah presiden pertama Indonesia.")
    );
    assert_eq!(
        outcome.audio_url.as_deref(),
        Some("/audio_response?robot_id=robot-1")
    );

    let audio = harness.audio_store.read("robot-1").await.unwrap();
    assert_eq!(audio, b"mp3-bytes");
    assert_eq!(harness.artifacts().len(), 1);
}

#[tokio::test]
async fn garbage_intent_label_falls_back_to_talk() {
    let harness = build_harness(HarnessOptions {
        intent_label: "backflip".to_string(),
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Talk);
    assert!(outcome.response.is_some());
}

#[tokio::test]
async fn classification_error_falls_back_to_talk() {
    let harness = build_harness(HarnessOptions {
        fail_classification: true,
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Talk);
    assert!(outcome.response.is_some());
}

#[tokio::test]
async fn sequential_talk_turns_keep_exactly_one_artifact() {
    let harness = build_harness(HarnessOptions::default());

    harness
        .pipeline
        .process_audio("robot-1", b"first")
        .await
        .unwrap();
    let first_artifacts = harness.artifacts();
    assert_eq!(first_artifacts.len(), 1);

    harness
        .pipeline
        .process_audio("robot-1", b"second")
        .await
        .unwrap();
    let second_artifacts = harness.artifacts();
    assert_eq!(second_artifacts.len(), 1);
    assert_ne!(first_artifacts[0], second_artifacts[0]);
}

#[tokio::test]
async fn primary_tts_failure_uses_fallback_once() {
    let harness = build_harness(HarnessOptions {
        primary_tts_fails: true,
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert!(outcome.audio_url.is_some());
    assert_eq!(
        harness
            .primary_tts_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        harness
            .fallback_tts_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn both_tts_tiers_failing_errors_without_artifact() {
    let harness = build_harness(HarnessOptions {
        primary_tts_fails: true,
        fallback_tts_fails: true,
        ..HarnessOptions::default()
    });

    let err = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Tts(_)));
    assert!(harness.artifacts().is_empty());
    assert!(harness.audio_store.get("robot-1").await.is_none());
}

#[tokio::test]
async fn dance_turn_publishes_without_response() {
    let harness = build_harness(HarnessOptions {
        transcript: "ayo joget bareng".to_string(),
        intent_label: "dance".to_string(),
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Dance);
    assert!(outcome.response.is_none());
    assert!(outcome.audio_url.is_none());
    assert_eq!(harness.retriever.call_count(), 0);
    assert!(harness.artifacts().is_empty());

    let sink = harness.sink.clone();
    wait_for(move || {
        sink.commands()
            .contains(&("robot-1".to_string(), "dance".to_string()))
    })
    .await;
}

#[tokio::test]
async fn non_talk_turn_clears_previous_artifact() {
    let harness = build_harness(HarnessOptions {
        intent_label: "sleep".to_string(),
        ..HarnessOptions::default()
    });

    // Seed a leftover artifact from an earlier talk turn
    let stale = harness.upload_dir.join("response_robot-1_stale.mp3");
    std::fs::write(&stale, b"stale").unwrap();
    harness.audio_store.set("robot-1", stale.clone()).await;

    harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    assert!(harness.audio_store.get("robot-1").await.is_none());
    assert!(!stale.exists());
}

#[tokio::test]
async fn gate_filters_far_candidates_from_prompt() {
    let harness = build_harness(HarnessOptions {
        candidates: vec![
            candidate("Michi dibuat tahun 2024.", 0.2),
            candidate("Resep nasi goreng.", 0.95),
        ],
        ..HarnessOptions::default()
    });

    harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    let prompt = harness.chat.last_grounded_prompt().unwrap();
    assert!(prompt.contains("Michi dibuat tahun 2024."));
    assert!(!prompt.contains("Resep nasi goreng."));
}

#[tokio::test]
async fn empty_gate_output_keeps_refusal_contract() {
    let harness = build_harness(HarnessOptions {
        candidates: vec![candidate("irrelevant", 5.0)],
        ..HarnessOptions::default()
    });

    harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    let prompt = harness.chat.last_grounded_prompt().unwrap();
    assert!(prompt.contains("(none)"));
    assert!(prompt.contains("do not know"));
}

#[tokio::test]
async fn talk_turn_is_logged_in_background() {
    let harness = build_harness(HarnessOptions::default());

    harness
        .pipeline
        .process_audio("robot-1", b"audio")
        .await
        .unwrap();

    let repo = harness.chat_logs.clone();
    wait_for(move || {
        repo.list("robot-1", 10)
            .map(|logs| logs.len() == 1 && logs[0].output.is_some())
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn wakeword_invalid_speech_skips_transcription() {
    let harness = build_harness(HarnessOptions::default());

    let outcome = harness
        .pipeline
        .detect_wakeword(&common::quiet_speech_bytes())
        .await
        .unwrap();

    assert!(!outcome.wakeword_detected);
    assert_eq!(outcome.reason, Some("invalid_speech"));
    assert_eq!(harness.transcriber.call_count(), 0);
}

#[tokio::test]
async fn wakeword_detected_in_valid_speech() {
    let harness = build_harness(HarnessOptions {
        transcript: "halo michi apa kabar".to_string(),
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .detect_wakeword(&valid_speech_bytes())
        .await
        .unwrap();

    assert!(outcome.wakeword_detected);
    assert!(outcome.reason.is_none());
    assert_eq!(harness.transcriber.call_count(), 1);
}

#[tokio::test]
async fn wakeword_absent_in_valid_speech() {
    let harness = build_harness(HarnessOptions {
        transcript: "tolong nyalakan lampu".to_string(),
        ..HarnessOptions::default()
    });

    let outcome = harness
        .pipeline
        .detect_wakeword(&valid_speech_bytes())
        .await
        .unwrap();

    assert!(!outcome.wakeword_detected);
}

#[tokio::test]
async fn text_chat_generates_and_logs_without_synthesis() {
    let harness = build_harness(HarnessOptions::default());

    let turn = harness
        .pipeline
        .text_chat("robot-1", "siapa presiden pertama indonesia")
        .await
        .unwrap();

    assert_eq!(turn.input, "siapa presiden pertama indonesia");
    assert_eq!(turn.output, "Soekarno adalah presiden pertama Indonesia.");

    // No speech synthesis and no artifact for text turns
    assert_eq!(
        harness
            .primary_tts_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert!(harness.artifacts().is_empty());

    let repo = harness.chat_logs.clone();
    wait_for(move || {
        repo.list("robot-1", 10)
            .map(|logs| logs.len() == 1)
            .unwrap_or(false)
    })
    .await;
}
