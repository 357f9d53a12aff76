//! Prefetching synthesis/playback pipeline.
//!
//! One background producer serializes calls into the shared engine and pushes
//! finished paragraphs into a bounded queue; the consumer drains the queue in
//! order, playing each unit to completion before pulling the next. The queue
//! capacity bounds how far synthesis may run ahead of playback, capping
//! memory and giving natural backpressure — the producer blocks on a full
//! queue until playback catches up.
//!
//! Cancellation is cooperative: the producer checks the session token before
//! each synthesis call, the consumer before and after each playback (and
//! while waiting on an empty queue). A synthesis call that has already
//! started runs to completion; the stop handler separately cuts the output
//! device so in-flight audio stops immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::{SpeechEngine, SynthesisParams};
use crate::error::SpeechError;
use crate::playback::AudioSink;

/// One synthesized paragraph, tagged with its position in the request.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    pub index: usize,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Items flowing from producer to consumer.
enum QueueItem {
    Unit(AudioUnit),
    /// The engine failed; no further paragraphs will be attempted.
    Failed(SpeechError),
    /// End of stream. Pushed exactly once per producer run.
    Done,
}

/// Result of a pipeline run.
///
/// An empty accumulation is a valid, non-error outcome — the session was
/// stopped before any audio was produced.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// All produced samples, concatenated in paragraph order.
    pub samples: Vec<f32>,

    /// The first unit's sample rate — authoritative for the whole request.
    pub sample_rate: Option<u32>,

    /// Units played to completion (may be fewer than units produced when the
    /// session was stopped).
    pub units_played: usize,

    /// Whether the run ended because the session was signalled.
    pub stopped: bool,
}

impl PipelineOutput {
    /// Duration of the accumulated audio in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_sec(&self) -> f64 {
        match self.sample_rate {
            Some(rate) if rate > 0 => self.samples.len() as f64 / f64::from(rate),
            _ => 0.0,
        }
    }
}

/// How long the consumer waits for the producer to wind down after the
/// playback loop exits. Expiry leaks the worker; it is logged, not fatal.
const PRODUCER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the full pipeline for one request.
///
/// Spawns the synthesis producer, drives playback on the caller's task, and
/// returns the accumulated samples. On a mid-request engine failure the whole
/// request fails and the accumulation is discarded.
pub async fn run(
    engine: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
    paragraphs: Vec<String>,
    params: SynthesisParams,
    cancel: CancellationToken,
    queue_capacity: usize,
) -> Result<PipelineOutput, SpeechError> {
    let total = paragraphs.len();
    let (tx, mut rx) = mpsc::channel::<QueueItem>(queue_capacity.max(1));

    let producer = tokio::spawn(synthesis_worker(
        engine,
        paragraphs,
        params,
        tx,
        cancel.clone(),
    ));

    let mut output = PipelineOutput::default();
    let mut failure: Option<SpeechError> = None;

    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Playback stopped while waiting for synthesis");
                output.stopped = true;
                break;
            }
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match item {
            QueueItem::Done => break,

            QueueItem::Failed(e) => {
                failure = Some(e);
                break;
            }

            QueueItem::Unit(unit) => {
                match output.sample_rate {
                    None => output.sample_rate = Some(unit.sample_rate),
                    Some(rate) if rate != unit.sample_rate => {
                        tracing::warn!(
                            expected = rate,
                            got = unit.sample_rate,
                            index = unit.index,
                            "Sample rate drifted mid-request; keeping the first unit's rate"
                        );
                    }
                    Some(_) => {}
                }

                // The unit counts as produced even if the stop check below
                // means it is never played — produced audio is persisted.
                output.samples.extend_from_slice(&unit.samples);

                if cancel.is_cancelled() {
                    tracing::debug!(index = unit.index, "Playback stopped before paragraph");
                    output.stopped = true;
                    break;
                }

                tracing::debug!(index = unit.index, total, "Playing paragraph");
                if let Err(e) = sink.play(unit.samples, unit.sample_rate).await {
                    failure = Some(e);
                    break;
                }
                output.units_played += 1;

                if cancel.is_cancelled() {
                    tracing::debug!(index = unit.index, "Playback stopped after paragraph");
                    output.stopped = true;
                    break;
                }
            }
        }
    }

    // Dropping the receiver unblocks a producer parked on a full queue.
    drop(rx);

    match tokio::time::timeout(PRODUCER_JOIN_TIMEOUT, producer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Synthesis worker panicked"),
        Err(_) => tracing::warn!(
            timeout_s = PRODUCER_JOIN_TIMEOUT.as_secs(),
            "Synthesis worker did not finish in time; leaking it"
        ),
    }

    if let Some(e) = failure {
        // Whole-request failure: audio produced before the error is not
        // salvageable, even though some of it may already have played.
        return Err(e);
    }

    Ok(output)
}

/// Producer: synthesize paragraphs in order, pushing each finished unit onto
/// the bounded queue.
///
/// Pushes exactly one `Done` sentinel on every exit path except engine
/// failure, which pushes a `Failed` marker instead and abandons the
/// remaining paragraphs.
async fn synthesis_worker(
    engine: Arc<dyn SpeechEngine>,
    paragraphs: Vec<String>,
    params: SynthesisParams,
    tx: mpsc::Sender<QueueItem>,
    cancel: CancellationToken,
) {
    let total = paragraphs.len();

    for (index, text) in paragraphs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::debug!(index, "Synthesis stopped by session cancel");
            let _ = tx.send(QueueItem::Done).await;
            return;
        }

        tracing::debug!(index, total, "Synthesizing paragraph");
        match engine.synthesize(&text, &params).await {
            Ok(audio) => {
                let unit = AudioUnit {
                    index,
                    samples: audio.samples,
                    sample_rate: audio.sample_rate,
                };
                // Blocks while the queue is full — backpressure from playback.
                if tx.send(QueueItem::Unit(unit)).await.is_err() {
                    return; // consumer gone
                }
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Synthesis failed; aborting remaining paragraphs");
                let _ = tx.send(QueueItem::Failed(e)).await;
                return;
            }
        }
    }

    let _ = tx.send(QueueItem::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakeSink};

    fn params() -> SynthesisParams {
        SynthesisParams {
            voice: "af_bella".to_string(),
            speed: 1.0,
            lang: "en-us".to_string(),
        }
    }

    fn paragraphs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn produces_and_plays_all_units_in_order() {
        let engine = Arc::new(FakeEngine::new());
        let sink = Arc::new(FakeSink::new());

        let output = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            paragraphs(&["alpha", "beta", "gamma"]),
            params(),
            CancellationToken::new(),
            3,
        )
        .await
        .unwrap();

        assert_eq!(engine.synthesized(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(output.units_played, 3);
        assert!(!output.stopped);
        assert_eq!(output.sample_rate, Some(24_000));

        // Played units match the produced units, in paragraph order.
        let played = sink.played();
        assert_eq!(played.len(), 3);
        let expected: Vec<f32> = played.iter().flat_map(|(s, _)| s.clone()).collect();
        assert_eq!(output.samples, expected);
    }

    #[tokio::test]
    async fn engine_failure_fails_the_whole_request() {
        let engine = Arc::new(FakeEngine::new().with_failure_at(1));
        let sink = Arc::new(FakeSink::new());

        let result = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            paragraphs(&["ok", "boom", "never"]),
            params(),
            CancellationToken::new(),
            3,
        )
        .await;

        assert!(matches!(result, Err(SpeechError::Synthesis(_))));
        // The failing paragraph aborts the rest.
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test]
    async fn cancel_before_start_yields_empty_stopped_output() {
        let engine = Arc::new(FakeEngine::new());
        let sink = Arc::new(FakeSink::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let output = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            paragraphs(&["one", "two"]),
            params(),
            cancel,
            3,
        )
        .await
        .unwrap();

        assert!(output.stopped);
        assert!(output.samples.is_empty());
        assert_eq!(output.units_played, 0);
        assert!(sink.played().is_empty());
    }

    #[tokio::test]
    async fn cancel_mid_playback_stops_before_later_units_play() {
        let engine = Arc::new(FakeEngine::new());
        let cancel = CancellationToken::new();
        // The sink cancels the session while the first unit is "playing".
        let sink = Arc::new(FakeSink::new().cancel_after_units(1, cancel.clone()));

        let output = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            paragraphs(&["one", "two", "three"]),
            params(),
            cancel,
            3,
        )
        .await
        .unwrap();

        assert!(output.stopped);
        assert_eq!(output.units_played, 1, "no unit after the stop may play");
        assert_eq!(sink.played().len(), 1);
        // The first unit's audio was produced before the stop, so it is kept.
        assert!(!output.samples.is_empty());
    }

    #[tokio::test]
    async fn sample_rate_of_first_unit_is_authoritative() {
        let engine = Arc::new(FakeEngine::new().with_rate_drift_at(1, 22_050));
        let sink = Arc::new(FakeSink::new());

        let output = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            paragraphs(&["one", "two"]),
            params(),
            CancellationToken::new(),
            3,
        )
        .await
        .unwrap();

        assert_eq!(output.sample_rate, Some(24_000));
        assert_eq!(output.units_played, 2);
    }

    #[tokio::test]
    async fn bounded_queue_does_not_deadlock_with_many_paragraphs() {
        let engine = Arc::new(FakeEngine::new());
        let sink = Arc::new(FakeSink::new());
        let texts: Vec<String> = (0..10).map(|i| format!("paragraph {i}")).collect();

        let output = run(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            texts,
            params(),
            CancellationToken::new(),
            2,
        )
        .await
        .unwrap();

        assert_eq!(output.units_played, 10);
        assert_eq!(engine.calls(), 10);
    }
}
