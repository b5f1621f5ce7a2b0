// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Silero VAD v5 wrapper.
//!
//! Holds the rolling 64-sample context and the recurrent 2x1x128 state
//! between calls, and periodically resets both to bound numerical drift in
//! long sessions. Input: 512 f32 samples at 16kHz. Output: speech
//! probability [0.0, 1.0].

use std::time::{Duration, Instant};

use crate::config::REQUIRED_CHUNK_SIZE;
use crate::error::EngineError;
use crate::inference::InferenceRuntime;

/// Context samples prepended to each frame.
pub const VAD_CONTEXT_SAMPLES: usize = 64;

/// Total model input size: context + frame.
pub const VAD_INPUT_SAMPLES: usize = VAD_CONTEXT_SAMPLES + REQUIRED_CHUNK_SIZE; // 576

/// Flattened recurrent state size (2 x 1 x 128).
pub const VAD_STATE_LEN: usize = 2 * 1 * 128;

/// Context and state are zeroed after this much wall-clock time. The
/// network accumulates numerical drift across long sessions; the rolling
/// context preserves short-term continuity across the reset.
const RESET_INTERVAL: Duration = Duration::from_secs(5);

/// Stateful VAD wrapper. Not safe for concurrent use.
pub struct SileroVad {
    /// Last 64 samples of the previous effective input.
    context: [f32; VAD_CONTEXT_SAMPLES],
    /// Recurrent state carried between calls, written back by the runtime.
    state: [f32; VAD_STATE_LEN],
    /// Assembled context-plus-frame input, reused across calls.
    input: [f32; VAD_INPUT_SAMPLES],
    last_reset: Instant,
}

impl SileroVad {
    pub fn new() -> Self {
        Self {
            context: [0.0; VAD_CONTEXT_SAMPLES],
            state: [0.0; VAD_STATE_LEN],
            input: [0.0; VAD_INPUT_SAMPLES],
            last_reset: Instant::now(),
        }
    }

    /// Zero the context and recurrent state and restart the drift timer.
    ///
    /// After this call the wrapper behaves exactly like a freshly
    /// constructed one.
    pub fn reset_state(&mut self) {
        self.context = [0.0; VAD_CONTEXT_SAMPLES];
        self.state = [0.0; VAD_STATE_LEN];
        self.last_reset = Instant::now();
    }

    /// Speech probability for one 512-sample frame.
    ///
    /// Fails with [`EngineError::ChunkSize`] for any other length.
    /// Inference failures are passed through.
    pub fn speech_prob(
        &mut self,
        runtime: &mut dyn InferenceRuntime,
        frame: &[f32],
    ) -> Result<f32, EngineError> {
        if frame.len() != REQUIRED_CHUNK_SIZE {
            return Err(EngineError::ChunkSize);
        }

        if self.last_reset.elapsed() >= RESET_INTERVAL {
            self.reset_state();
        }

        self.input[..VAD_CONTEXT_SAMPLES].copy_from_slice(&self.context);
        self.input[VAD_CONTEXT_SAMPLES..].copy_from_slice(frame);

        // Roll the context forward before the inference call: the next
        // call sees the last 64 samples of this effective input.
        self.context
            .copy_from_slice(&self.input[VAD_INPUT_SAMPLES - VAD_CONTEXT_SAMPLES..]);

        let probability = runtime.run_vad(&self.input, &mut self.state)?;
        Ok(probability)
    }
}

impl Default for SileroVad {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SileroVad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SileroVad")
            .field("last_reset", &self.last_reset)
            .finish_non_exhaustive()
    }
}
