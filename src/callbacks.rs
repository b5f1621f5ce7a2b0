// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! User-facing lifecycle callbacks.
//!
//! All callbacks are optional and run synchronously on the thread that
//! calls into the engine; the engine spawns no tasks or threads. Slices
//! passed to `on_chunk` and `on_segment_ready` are borrowed views into
//! engine-owned buffers that are reused across calls: copy them if you
//! need to retain the audio.

use crate::error::EngineError;

type Hook = Box<dyn FnMut()>;
type AudioHook = Box<dyn FnMut(&[f32])>;

/// Optional engine callbacks.
///
/// Within a single frame, dispatch order is fixed: `on_speech_start`,
/// `on_chunk`, `on_segment_ready` (possibly repeated), `on_turn_prediction`,
/// `on_speech_end`.
#[derive(Default)]
pub struct Callbacks {
    /// Fired by `start()`.
    pub on_listening_started: Option<Hook>,
    /// Fired by `stop()`.
    pub on_listening_stopped: Option<Hook>,
    /// A new speech segment was triggered. Suppressed while a pending
    /// turn is being continued.
    pub on_speech_start: Option<Hook>,
    /// The conversational turn ended: a segment was classified complete,
    /// hit the duration cap, or a pending turn timed out.
    pub on_speech_end: Option<Hook>,
    /// Every frame accepted while listening, raw as pushed.
    pub on_chunk: Option<AudioHook>,
    /// Segment audio in emit-interval slices, tail included when the
    /// segment ends.
    pub on_segment_ready: Option<AudioHook>,
    /// The turn model's verdict for a segment that ended by silence.
    pub on_turn_prediction: Option<Box<dyn FnMut(bool, f32)>>,
    /// Inference failures, also returned from `push_pcm`.
    pub on_error: Option<Box<dyn FnMut(&EngineError)>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listening_started(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_listening_started = Some(Box::new(f));
        self
    }

    pub fn with_listening_stopped(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_listening_stopped = Some(Box::new(f));
        self
    }

    pub fn with_speech_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_speech_start = Some(Box::new(f));
        self
    }

    pub fn with_speech_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_speech_end = Some(Box::new(f));
        self
    }

    pub fn with_chunk(mut self, f: impl FnMut(&[f32]) + 'static) -> Self {
        self.on_chunk = Some(Box::new(f));
        self
    }

    pub fn with_segment_ready(mut self, f: impl FnMut(&[f32]) + 'static) -> Self {
        self.on_segment_ready = Some(Box::new(f));
        self
    }

    pub fn with_turn_prediction(mut self, f: impl FnMut(bool, f32) + 'static) -> Self {
        self.on_turn_prediction = Some(Box::new(f));
        self
    }

    pub fn with_error(mut self, f: impl FnMut(&EngineError) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_listening_started", &self.on_listening_started.is_some())
            .field("on_listening_stopped", &self.on_listening_stopped.is_some())
            .field("on_speech_start", &self.on_speech_start.is_some())
            .field("on_speech_end", &self.on_speech_end.is_some())
            .field("on_chunk", &self.on_chunk.is_some())
            .field("on_segment_ready", &self.on_segment_ready.is_some())
            .field("on_turn_prediction", &self.on_turn_prediction.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
