//! Integration tests for `SpeechService::speak` — the full request flow.
//!
//! These tests drive the service end to end with fake engines and sinks. No
//! real audio hardware or model files are required.
//!
//! # What is tested
//!
//! - A two-paragraph request produces, plays, and persists both units in order
//! - The persisted WAV's duration equals total samples / sample rate
//! - A stop before the first unit yields a `Stopped` outcome, no file, and an
//!   empty session registry
//! - An engine failure mid-request fails the whole request without a file
//! - An engine-load failure surfaces as such and leaves health degraded
//! - The admission counter returns to zero on every outcome
//! - Concurrent requests never overlap inside the engine

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use orator_voice::service::{SpeakOutcome, SpeakRequest};
use orator_voice::testing::{FakeEngine, FakeLoader, FakeSink};
use orator_voice::{ServiceConfig, SpeechError, SpeechService};

// ── Helpers ────────────────────────────────────────────────────────

struct Harness {
    service: Arc<SpeechService>,
    engine: Arc<FakeEngine>,
    sink: Arc<FakeSink>,
    save_dir: TempDir,
}

fn harness_with(engine: FakeEngine, sink: FakeSink) -> Harness {
    let save_dir = TempDir::new().unwrap();
    let engine = Arc::new(engine);
    let sink = Arc::new(sink);
    let loader = FakeLoader::new(Arc::clone(&engine) as Arc<dyn orator_voice::SpeechEngine>);

    let config = ServiceConfig::default().with_save_dir(save_dir.path());
    let service = Arc::new(SpeechService::new(
        Arc::new(loader),
        Arc::clone(&sink) as Arc<dyn orator_voice::AudioSink>,
        config,
    ));

    Harness {
        service,
        engine,
        sink,
        save_dir,
    }
}

fn harness() -> Harness {
    harness_with(FakeEngine::new(), FakeSink::new())
}

fn request(text: &str) -> SpeakRequest {
    SpeakRequest {
        text: text.to_string(),
        ..SpeakRequest::default()
    }
}

fn saved_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

// ── Success path ───────────────────────────────────────────────────

#[tokio::test]
async fn two_paragraphs_are_synthesized_played_and_saved_in_order() {
    let h = harness();

    let outcome = h
        .service
        .speak(request("Hello.\n\nWorld."))
        .await
        .unwrap();

    let SpeakOutcome::Saved {
        filename,
        voice,
        paragraphs,
        duration_sec,
        ..
    } = outcome
    else {
        panic!("expected Saved outcome");
    };

    assert_eq!(paragraphs, 2);
    assert_eq!(voice, "af_bella");
    assert_eq!(h.engine.synthesized(), vec!["Hello.", "World."]);
    assert_eq!(h.sink.played().len(), 2);

    // The file exists and its duration matches samples / rate.
    let path = h.save_dir.path().join(&filename);
    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 24_000);
    let expected = f64::from(reader.len()) / f64::from(spec.sample_rate);
    assert!((duration_sec - expected).abs() < 1e-9);

    assert!(h.service.sessions().is_empty());
    assert_eq!(h.service.active_requests(), 0);
}

#[tokio::test]
async fn unknown_voice_falls_back_to_default() {
    let h = harness();

    let outcome = h
        .service
        .speak(SpeakRequest {
            text: "Some text.".to_string(),
            voice: Some("not_a_voice".to_string()),
            ..SpeakRequest::default()
        })
        .await
        .unwrap();

    let SpeakOutcome::Saved { voice, .. } = outcome else {
        panic!("expected Saved outcome");
    };
    assert_eq!(voice, "af_bella");
}

#[tokio::test]
async fn client_supplied_session_id_is_echoed() {
    let h = harness();

    let outcome = h
        .service
        .speak(SpeakRequest {
            text: "Echo me.".to_string(),
            session_id: Some("my-session".to_string()),
            ..SpeakRequest::default()
        })
        .await
        .unwrap();

    let SpeakOutcome::Saved { session_id, .. } = outcome else {
        panic!("expected Saved outcome");
    };
    assert_eq!(session_id, "my-session");
}

// ── Stop handling ──────────────────────────────────────────────────

#[tokio::test]
async fn stop_before_first_unit_yields_stopped_and_no_file() {
    // Synthesis takes long enough for the stop to land first.
    let h = harness_with(
        FakeEngine::new().with_delay(Duration::from_millis(200)),
        FakeSink::new(),
    );

    let speak = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move {
            service
                .speak(SpeakRequest {
                    text: "Never heard.".to_string(),
                    session_id: Some("s1".to_string()),
                    ..SpeakRequest::default()
                })
                .await
        })
    };

    // Let the request register its session, then stop it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.service.stop("s1"));

    let outcome = speak.await.unwrap().unwrap();
    assert!(matches!(outcome, SpeakOutcome::Stopped { session_id } if session_id == "s1"));

    assert!(h.sink.played().is_empty());
    assert!(saved_files(&h.save_dir).is_empty());
    assert!(h.service.sessions().is_empty());
    assert_eq!(h.service.active_requests(), 0);
    // The stop also cut the output device.
    assert_eq!(h.sink.stop_calls(), 1);
}

#[tokio::test]
async fn stop_mid_request_persists_units_produced_so_far() {
    // Playback is slow enough that the stop lands while the first unit is
    // still "playing"; synthesis has already produced units ahead of it.
    let h = harness_with(
        FakeEngine::new(),
        FakeSink::new().with_delay(Duration::from_millis(80)),
    );

    let speak = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move {
            service
                .speak(SpeakRequest {
                    text: "One.\n\nTwo.\n\nThree.".to_string(),
                    session_id: Some("s2".to_string()),
                    ..SpeakRequest::default()
                })
                .await
        })
    };

    // Stop while the first unit is playing.
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(h.service.stop("s2"));

    let outcome = speak.await.unwrap().unwrap();
    let SpeakOutcome::Saved { filename, .. } = outcome else {
        panic!("produced audio before the stop must be persisted");
    };

    assert!(h.save_dir.path().join(&filename).exists());
    // Never played anything scheduled after the stop was observed.
    assert!(h.sink.played().len() < 3);
    assert!(h.service.sessions().is_empty());
    assert_eq!(h.service.active_requests(), 0);
}

#[tokio::test]
async fn stop_for_unknown_session_reports_not_found() {
    let h = harness();
    assert!(!h.service.stop("ghost"));
    assert_eq!(h.sink.stop_calls(), 0);
}

// ── Failure paths ──────────────────────────────────────────────────

#[tokio::test]
async fn engine_failure_discards_partial_audio() {
    let h = harness_with(FakeEngine::new().with_failure_at(1), FakeSink::new());

    let result = h.service.speak(request("One.\n\nTwo.\n\nThree.")).await;

    assert!(matches!(result, Err(SpeechError::Synthesis(_))));
    assert!(saved_files(&h.save_dir).is_empty(), "no partial file");
    assert!(h.service.sessions().is_empty());
    assert_eq!(h.service.active_requests(), 0);
}

#[tokio::test]
async fn empty_text_is_rejected_without_side_effects() {
    let h = harness();

    let result = h.service.speak(request("   ")).await;

    assert!(matches!(result, Err(SpeechError::Validation(_))));
    assert_eq!(h.engine.calls(), 0);
    assert!(h.service.sessions().is_empty());
    assert_eq!(h.service.active_requests(), 0);
}

#[tokio::test]
async fn load_failure_surfaces_and_health_reports_degraded() {
    let save_dir = TempDir::new().unwrap();
    let sink = Arc::new(FakeSink::new());
    let service = SpeechService::new(
        Arc::new(FakeLoader::unavailable()),
        Arc::clone(&sink) as Arc<dyn orator_voice::AudioSink>,
        ServiceConfig::default().with_save_dir(save_dir.path()),
    );

    let result = service.speak(request("Hello.")).await;
    assert!(matches!(result, Err(SpeechError::EngineLoad(_))));
    assert_eq!(service.active_requests(), 0);

    let health = service.health();
    assert!(health.status.starts_with("degraded"));
    assert!(!health.engine_loaded);
}

// ── Health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reflects_engine_residency() {
    let h = harness();

    let before = h.service.health();
    assert!(!before.engine_loaded);
    assert_eq!(before.status, "healthy (engine unloaded - idle)");

    h.service.speak(request("Load the engine.")).await.unwrap();

    let after = h.service.health();
    assert!(after.engine_loaded);
    assert_eq!(after.status, "healthy");
    assert!(after.uptime_seconds >= 0.0);
}

// ── Concurrency ────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_requests_never_overlap_inside_the_engine() {
    let h = harness_with(
        FakeEngine::new().with_delay(Duration::from_millis(15)),
        FakeSink::new(),
    );

    let a = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.speak(request("A one.\n\nA two.\n\nA three.")).await })
    };
    let b = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.speak(request("B one.\n\nB two.\n\nB three.")).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(h.engine.calls(), 6);
    assert!(
        !h.engine.overlap_detected(),
        "two synthesis calls executed simultaneously"
    );
    assert_eq!(h.service.active_requests(), 0);
    assert!(h.service.sessions().is_empty());
}
