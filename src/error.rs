// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Error types surfaced by the engine.

use std::path::PathBuf;

use crate::config::REQUIRED_CHUNK_SIZE;
use crate::inference::InferenceError;

/// A configuration field failed validation at engine construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sample_rate must be 16000, got {0}")]
    SampleRate(u32),
    #[error("chunk_size must be 512, got {0}")]
    ChunkSize(usize),
    #[error("vad_threshold must be in [0, 1], got {0}")]
    VadThreshold(f32),
    #[error("stop_ms must be > 0")]
    StopMs,
    #[error("max_duration_seconds must be > 0, got {0}")]
    MaxDuration(f32),
    #[error("segment_emit_ms must be > 0")]
    SegmentEmit,
    #[error("turn_threshold must be in [0, 1], got {0}")]
    TurnThreshold(f32),
    #[error("VAD model file not found: {0}")]
    VadModelNotFound(PathBuf),
    #[error("turn model file not found: {0}")]
    TurnModelNotFound(PathBuf),
}

/// Errors returned by engine operations.
///
/// Inference failures during `push_pcm` leave the engine in a consistent
/// state; the caller may keep pushing frames. Configuration and lifecycle
/// errors are fatal for the engine instance.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A pushed frame was not exactly 512 samples long.
    #[error("chunk must be exactly {REQUIRED_CHUNK_SIZE} samples")]
    ChunkSize,
    /// The engine has been closed; no further frames are accepted.
    #[error("engine is closed")]
    EngineClosed,
    /// The turn classifier received an empty segment.
    #[error("invalid segment for turn classification")]
    InvalidSegment,
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Passed through verbatim from the inference runtime.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
}
