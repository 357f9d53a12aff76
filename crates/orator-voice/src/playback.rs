//! Audio playback — TTS output via `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the output device
//! is confined to a dedicated OS thread and every operation is routed through
//! a command channel. The public [`RodioSink`] is the `Send + Sync` proxy the
//! pipeline holds.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use rodio::{OutputStream, Sink};
use tokio::sync::oneshot;

use crate::error::SpeechError;

// ── Sink trait ─────────────────────────────────────────────────────

/// Abstraction over the audio output device.
///
/// All methods take `&self`, so the trait is object-safe and usable as
/// `Arc<dyn AudioSink>` inside the pipeline. [`play`](AudioSink::play) is the
/// sequencing primitive: it resolves only when the unit has fully drained or
/// playback was stopped, so the consumer can never start unit N+1 before unit
/// N finishes.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one audio unit and wait for it to finish (or be stopped).
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), SpeechError>;

    /// Cut any in-flight audio immediately. Fire-and-forget.
    fn stop(&self);

    /// Whether audio is currently playing.
    fn is_playing(&self) -> bool;
}

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the pipeline to the playback thread.
enum PlaybackCommand {
    /// Queue a unit and report back when it drains or is stopped.
    Play {
        samples: Vec<f32>,
        sample_rate: u32,
        done: oneshot::Sender<Result<(), SpeechError>>,
    },

    /// Stop the current sink immediately (fire-and-forget).
    Stop,

    /// Query whether audio is currently playing.
    IsPlaying { reply: mpsc::Sender<bool> },

    /// Shut down the playback thread, releasing the output device.
    Shutdown,
}

// ── Rodio-backed implementation ────────────────────────────────────

/// `Send + Sync` handle to the dedicated playback thread.
pub struct RodioSink {
    cmd_tx: mpsc::Sender<PlaybackCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioSink {
    /// Spawn the playback thread and open the default output device.
    ///
    /// Errors from `OutputStream::try_default` are propagated back through a
    /// one-shot init channel.
    pub fn spawn() -> Result<Self, SpeechError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlaybackCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), SpeechError>>();

        let thread = thread::Builder::new()
            .name("orator-playback".into())
            .spawn(move || Self::run(cmd_rx, init_tx))
            .map_err(|e| {
                SpeechError::OutputStream(format!("failed to spawn playback thread: {e}"))
            })?;

        init_rx
            .recv()
            .map_err(|_| SpeechError::PlaybackThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// The body of the playback thread. Owns the `OutputStream` for its
    /// entire lifetime — it never crosses a thread boundary.
    fn run(cmd_rx: mpsc::Receiver<PlaybackCommand>, init_tx: mpsc::Sender<Result<(), SpeechError>>) {
        let (_stream, stream_handle) = match OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                let _ = init_tx.send(Err(SpeechError::OutputStream(e.to_string())));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            // Caller dropped — nothing to do.
            return;
        }

        tracing::info!("Audio playback initialized on default output device");

        let mut current: Option<Arc<Sink>> = None;

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                PlaybackCommand::Play {
                    samples,
                    sample_rate,
                    done,
                } => {
                    let sink = match Sink::try_new(&stream_handle) {
                        Ok(sink) => Arc::new(sink),
                        Err(e) => {
                            let _ = done.send(Err(SpeechError::OutputStream(e.to_string())));
                            continue;
                        }
                    };

                    sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, samples));
                    current = Some(Arc::clone(&sink));

                    tracing::debug!(sample_rate, "Audio playback started");

                    // `sleep_until_end()` blocks until the queue drains or
                    // `stop()` drops the sources, so the watcher must not run
                    // on the command loop — a Stop command could never land.
                    thread::spawn(move || {
                        sink.sleep_until_end();
                        let _ = done.send(Ok(()));
                    });
                }

                PlaybackCommand::Stop => {
                    if let Some(sink) = current.take() {
                        sink.stop();
                        tracing::debug!("Audio playback stopped");
                    }
                }

                PlaybackCommand::IsPlaying { reply } => {
                    let playing = current.as_ref().is_some_and(|sink| !sink.empty());
                    let _ = reply.send(playing);
                }

                PlaybackCommand::Shutdown => break,
            }
        }

        tracing::debug!("Playback thread shutting down");
    }
}

#[async_trait::async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), SpeechError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.cmd_tx
            .send(PlaybackCommand::Play {
                samples,
                sample_rate,
                done: done_tx,
            })
            .map_err(|_| SpeechError::PlaybackThreadDied)?;

        done_rx.await.map_err(|_| SpeechError::PlaybackThreadDied)?
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(PlaybackCommand::Stop);
    }

    fn is_playing(&self) -> bool {
        let (tx, rx) = mpsc::channel();
        if self
            .cmd_tx
            .send(PlaybackCommand::IsPlaying { reply: tx })
            .is_err()
        {
            return false;
        }
        rx.recv().unwrap_or(false)
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        // Best-effort shutdown — the thread may already be dead.
        let _ = self.cmd_tx.send(PlaybackCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
