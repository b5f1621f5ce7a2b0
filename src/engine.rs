// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! The speech-turn detection engine.
//!
//! Orchestrates the VAD, the segmenter and the turn classifier under a
//! strict synchronous contract: the host delivers one 512-sample frame at
//! a time via [`Engine::push_pcm`], all three stages run inline, and user
//! callbacks fire on the caller's thread before the call returns.
//!
//! When a segment ends by silence but the turn model judges the turn
//! incomplete, the engine withholds `on_speech_end` and enters a pending
//! state: a follow-up segment continues the turn without a new
//! `on_speech_start`, and either a completing segment or the configured
//! silence timeout delivers the single deferred `on_speech_end`.

use crate::audio::segment::{EndReason, Segmenter, StepEvent};
use crate::audio::turn::TurnClassifier;
use crate::audio::vad::SileroVad;
use crate::callbacks::Callbacks;
use crate::config::{Config, REQUIRED_CHUNK_SIZE};
use crate::error::EngineError;
use crate::inference::{InferenceRuntime, OrtRuntime};

/// Streaming speech-turn detection engine.
///
/// Single-threaded and not safe for concurrent use; the caller owns
/// serialization of `push_pcm` and the lifecycle methods.
pub struct Engine {
    config: Config,
    callbacks: Callbacks,
    /// `None` once the engine is closed; dropping it releases both
    /// inference sessions.
    runtime: Option<Box<dyn InferenceRuntime>>,
    vad: SileroVad,
    segmenter: Segmenter,
    turn: TurnClassifier,

    listening: bool,
    closed: bool,

    /// Target samples per `on_segment_ready` slice.
    segment_emit_samples: usize,
    /// Samples of the current segment already emitted.
    segment_emitted_so_far: usize,

    turn_pending: bool,
    turn_pending_silence_chunks: usize,
    /// Silence frames that resolve a pending turn; 0 disables the timeout.
    turn_timeout_chunks: usize,
}

impl Engine {
    /// Create an engine backed by ONNX Runtime sessions for both models.
    ///
    /// Validates the configuration, initializes the process-wide inference
    /// environment (idempotent) and loads both models.
    pub fn new(config: Config, callbacks: Callbacks) -> Result<Self, EngineError> {
        config.validate()?;
        let runtime = OrtRuntime::load(&config.vad_model_path, &config.turn_model_path)?;
        Ok(Self::build(config, callbacks, Box::new(runtime)))
    }

    /// Create an engine over a caller-supplied inference runtime.
    ///
    /// This is the seam for embedding a different runtime or a scripted
    /// fake in tests; configuration is validated the same way.
    pub fn with_runtime(
        config: Config,
        callbacks: Callbacks,
        runtime: Box<dyn InferenceRuntime>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, callbacks, runtime))
    }

    fn build(config: Config, callbacks: Callbacks, runtime: Box<dyn InferenceRuntime>) -> Self {
        let segmenter = Segmenter::new(
            config.sample_rate,
            config.chunk_size,
            config.pre_speech_ms,
            config.stop_ms,
            config.max_duration_seconds,
        );

        let mut segment_emit_samples =
            (config.segment_emit_ms as f64 * config.sample_rate as f64 / 1000.0).round() as usize;
        if segment_emit_samples == 0 {
            segment_emit_samples = config.chunk_size;
        }

        let frame_ms = config.frame_ms();
        let turn_timeout_chunks = if config.turn_timeout_ms > 0 {
            (((config.turn_timeout_ms + frame_ms - 1) / frame_ms) as usize).max(1)
        } else {
            0
        };

        Self {
            config,
            callbacks,
            runtime: Some(runtime),
            vad: SileroVad::new(),
            segmenter,
            turn: TurnClassifier::new(),
            listening: false,
            closed: false,
            segment_emit_samples,
            segment_emitted_so_far: 0,
            turn_pending: false,
            turn_pending_silence_chunks: 0,
            turn_timeout_chunks,
        }
    }

    /// Start listening. Fires `on_listening_started`.
    pub fn start(&mut self) {
        if self.closed {
            return;
        }
        self.listening = true;
        if let Some(cb) = self.callbacks.on_listening_started.as_mut() {
            cb();
        }
    }

    /// Stop listening. Any in-flight segment is finalized first: its
    /// remaining audio is emitted and a single `on_speech_end` resolves
    /// the turn (the classifier is skipped, as for a capped segment).
    /// Fires `on_listening_stopped` last.
    pub fn stop(&mut self) {
        if self.closed {
            return;
        }
        self.listening = false;

        if let Some(segment) = self.segmenter.take_segment() {
            tracing::debug!(samples = segment.len(), "segment finalized by stop");
            self.emit_segment_windows(&segment);
            self.emit_segment_tail(&segment);
            self.turn_pending = false;
            self.turn_pending_silence_chunks = 0;
            self.segment_emitted_so_far = 0;
            if let Some(cb) = self.callbacks.on_speech_end.as_mut() {
                cb();
            }
        }

        if let Some(cb) = self.callbacks.on_listening_stopped.as_mut() {
            cb();
        }
    }

    /// Clear VAD state, segmentation state and any pending turn. The
    /// inference sessions stay open.
    pub fn reset(&mut self) {
        if self.closed {
            return;
        }
        self.vad.reset_state();
        self.segmenter.reset();
        self.turn_pending = false;
        self.turn_pending_silence_chunks = 0;
        self.segment_emitted_so_far = 0;
    }

    /// Release both inference sessions. After this, every call is a fast
    /// no-op except `push_pcm`, which fails with
    /// [`EngineError::EngineClosed`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.listening = false;
        self.runtime = None;
    }

    /// Process one frame of 512 f32 samples (mono, 16kHz).
    ///
    /// Runs VAD, advances the segmenter and, when a segment ends by
    /// silence, the turn classifier, firing callbacks inline. Returns
    /// [`EngineError::ChunkSize`] for any other frame length and
    /// [`EngineError::EngineClosed`] after `close()`. Inference errors are
    /// delivered to `on_error` and returned; the engine stays usable.
    pub fn push_pcm(&mut self, chunk: &[f32]) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::EngineClosed);
        }
        if chunk.len() != REQUIRED_CHUNK_SIZE {
            return Err(EngineError::ChunkSize);
        }
        if !self.listening {
            return Ok(());
        }
        let Some(runtime) = self.runtime.as_deref_mut() else {
            return Err(EngineError::EngineClosed);
        };

        let probability = match self.vad.speech_prob(runtime, chunk) {
            Ok(p) => p,
            Err(err) => {
                if let Some(cb) = self.callbacks.on_error.as_mut() {
                    cb(&err);
                }
                return Err(err);
            }
        };
        let is_speech = probability > self.config.vad_threshold;
        tracing::trace!(probability, is_speech, "vad frame");

        // Pending-turn bookkeeping runs before the segmenter advances so
        // the deferred end cannot race a segment that starts on this frame.
        if self.turn_pending {
            if is_speech {
                self.turn_pending_silence_chunks = 0;
            } else {
                self.turn_pending_silence_chunks += 1;
                if self.turn_timeout_chunks > 0
                    && self.turn_pending_silence_chunks >= self.turn_timeout_chunks
                {
                    self.turn_pending = false;
                    self.turn_pending_silence_chunks = 0;
                    tracing::debug!("pending turn resolved by silence timeout");
                    if let Some(cb) = self.callbacks.on_speech_end.as_mut() {
                        cb();
                    }
                }
            }
        }

        let event = self.segmenter.step(is_speech, chunk);

        if matches!(event, StepEvent::Started) {
            self.segment_emitted_so_far = 0;
            tracing::debug!(probability, continued = self.turn_pending, "segment started");
            // A quick re-trigger inside a pending-turn window continues
            // the turn silently instead of announcing a new start.
            if !self.turn_pending {
                if let Some(cb) = self.callbacks.on_speech_start.as_mut() {
                    cb();
                }
            }
        }

        if let Some(cb) = self.callbacks.on_chunk.as_mut() {
            cb(chunk);
        }

        // Incremental emission from the live buffer while the segment
        // grows.
        if let Some(segment) = self.segmenter.segment() {
            if let Some(cb) = self.callbacks.on_segment_ready.as_mut() {
                while segment.len() - self.segment_emitted_so_far >= self.segment_emit_samples {
                    let start = self.segment_emitted_so_far;
                    cb(&segment[start..start + self.segment_emit_samples]);
                    self.segment_emitted_so_far = start + self.segment_emit_samples;
                }
            }
        }

        if let StepEvent::Ended { reason, segment } = event {
            tracing::debug!(samples = segment.len(), ?reason, "segment ended");

            // Flush whole windows the ending frame completed, then the
            // tail, before any end-of-turn decision.
            self.emit_segment_windows(&segment);
            self.emit_segment_tail(&segment);

            let mut classify_error: Option<EngineError> = None;
            let mut should_end_speech = true;

            if reason == EndReason::Silence {
                let Some(runtime) = self.runtime.as_deref_mut() else {
                    return Err(EngineError::EngineClosed);
                };
                match self.turn.classify(runtime, &segment) {
                    Ok(prediction) => {
                        tracing::debug!(
                            complete = prediction.complete,
                            probability = prediction.probability,
                            "turn prediction"
                        );
                        if let Some(cb) = self.callbacks.on_turn_prediction.as_mut() {
                            cb(prediction.complete, prediction.probability);
                        }
                        if prediction.probability < self.config.turn_threshold {
                            should_end_speech = false;
                        }
                    }
                    Err(err) => {
                        if let Some(cb) = self.callbacks.on_error.as_mut() {
                            cb(&err);
                        }
                        should_end_speech = false;
                        classify_error = Some(err);
                    }
                }
            }
            // A segment cut at the duration cap is artificially truncated
            // and would mislead the classifier; it always ends the turn.

            if should_end_speech {
                self.turn_pending = false;
                self.turn_pending_silence_chunks = 0;
                if let Some(cb) = self.callbacks.on_speech_end.as_mut() {
                    cb();
                }
            } else {
                self.turn_pending = true;
                self.turn_pending_silence_chunks = 0;
            }
            self.segment_emitted_so_far = 0;

            if let Some(err) = classify_error {
                return Err(err);
            }
        }

        Ok(())
    }

    /// Emit every complete emit-interval window of `segment` that has not
    /// been emitted yet.
    fn emit_segment_windows(&mut self, segment: &[f32]) {
        if let Some(cb) = self.callbacks.on_segment_ready.as_mut() {
            while segment.len() - self.segment_emitted_so_far >= self.segment_emit_samples {
                let start = self.segment_emitted_so_far;
                cb(&segment[start..start + self.segment_emit_samples]);
                self.segment_emitted_so_far = start + self.segment_emit_samples;
            }
        }
    }

    /// Emit whatever is left of `segment` past the emitted windows.
    fn emit_segment_tail(&mut self, segment: &[f32]) {
        if let Some(cb) = self.callbacks.on_segment_ready.as_mut() {
            if segment.len() > self.segment_emitted_so_far {
                cb(&segment[self.segment_emitted_so_far..]);
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("listening", &self.listening)
            .field("closed", &self.closed)
            .field("turn_pending", &self.turn_pending)
            .field("segment_emit_samples", &self.segment_emit_samples)
            .field("turn_timeout_chunks", &self.turn_timeout_chunks)
            .finish_non_exhaustive()
    }
}
