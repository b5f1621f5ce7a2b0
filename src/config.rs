// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Engine configuration and validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The only sample rate the engine accepts.
pub const REQUIRED_SAMPLE_RATE: u32 = 16000;

/// The only frame size the engine accepts (32ms at 16kHz).
pub const REQUIRED_CHUNK_SIZE: usize = 512;

/// Engine configuration. All fields are validated once at engine
/// construction and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input sample rate in Hz. Must be 16000.
    pub sample_rate: u32,
    /// Samples per frame pushed into the engine. Must be 512.
    pub chunk_size: usize,
    /// Speech probability threshold in [0, 1]; a frame counts as speech
    /// when the VAD probability is strictly above it.
    pub vad_threshold: f32,
    /// Milliseconds of audio kept before the speech trigger (e.g. 200).
    pub pre_speech_ms: u32,
    /// Milliseconds of trailing silence that end a segment (e.g. 500).
    pub stop_ms: u32,
    /// Hard cap per segment in seconds (e.g. 600 for 10 minutes).
    pub max_duration_seconds: f32,
    /// How often `on_segment_ready` fires while speech is active, in
    /// milliseconds. Any remaining tail is emitted when the segment ends.
    pub segment_emit_ms: u32,
    /// Turn-completion probability below which a segment end is held as a
    /// pending turn instead of firing `on_speech_end`. In [0, 1].
    pub turn_threshold: f32,
    /// Trailing silence, in milliseconds, after which a pending turn is
    /// resolved with a deferred `on_speech_end`. 0 disables the timeout.
    pub turn_timeout_ms: u32,
    /// Path to the Silero VAD ONNX model.
    pub vad_model_path: PathBuf,
    /// Path to the turn-completion ONNX model.
    pub turn_model_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: REQUIRED_SAMPLE_RATE,
            chunk_size: REQUIRED_CHUNK_SIZE,
            vad_threshold: 0.5,
            pre_speech_ms: 200,
            stop_ms: 500,
            max_duration_seconds: 600.0,
            segment_emit_ms: 1000,
            turn_threshold: 0.5,
            turn_timeout_ms: 0,
            vad_model_path: PathBuf::new(),
            turn_model_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Check every field against its constraint.
    ///
    /// Returns the first violation found, in field order. Model paths must
    /// name existing files.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate != REQUIRED_SAMPLE_RATE {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.chunk_size != REQUIRED_CHUNK_SIZE {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            return Err(ConfigError::VadThreshold(self.vad_threshold));
        }
        if self.stop_ms == 0 {
            return Err(ConfigError::StopMs);
        }
        if !(self.max_duration_seconds > 0.0) {
            return Err(ConfigError::MaxDuration(self.max_duration_seconds));
        }
        if self.segment_emit_ms == 0 {
            return Err(ConfigError::SegmentEmit);
        }
        if !(0.0..=1.0).contains(&self.turn_threshold) {
            return Err(ConfigError::TurnThreshold(self.turn_threshold));
        }
        if !self.vad_model_path.is_file() {
            return Err(ConfigError::VadModelNotFound(self.vad_model_path.clone()));
        }
        if !self.turn_model_path.is_file() {
            return Err(ConfigError::TurnModelNotFound(self.turn_model_path.clone()));
        }
        Ok(())
    }

    /// Duration of one frame in milliseconds, floored to at least 1.
    pub(crate) fn frame_ms(&self) -> u32 {
        ((1000 * self.chunk_size as u32) / self.sample_rate).max(1)
    }
}
