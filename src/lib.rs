// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Streaming speech-turn detection.
//!
//! Given a stream of mono 16kHz f32 PCM delivered in fixed 512-sample
//! frames, the engine detects when a speaker begins talking, when a
//! segment of speech ends, and whether that ending is a complete
//! conversational turn or just a pause. It combines Silero VAD for
//! per-frame speech probability, a segmentation state machine with
//! pre-speech padding, and a neural turn-completion model fed 80x800
//! Whisper-style log-mel features.
//!
//! Everything runs synchronously on the caller's thread: push a frame,
//! callbacks fire inline, the call returns.
//!
//! ```no_run
//! use smart_turn::{Callbacks, Config, Engine};
//!
//! let config = Config {
//!     vad_model_path: "models/silero_vad.onnx".into(),
//!     turn_model_path: "models/smart_turn_v3.onnx".into(),
//!     turn_timeout_ms: 3000,
//!     ..Config::default()
//! };
//! let callbacks = Callbacks::new()
//!     .with_speech_start(|| println!("speech started"))
//!     .with_turn_prediction(|complete, prob| println!("turn complete={complete} p={prob:.3}"))
//!     .with_speech_end(|| println!("turn ended"));
//!
//! let mut engine = Engine::new(config, callbacks)?;
//! engine.start();
//! let frame = vec![0.0f32; 512];
//! engine.push_pcm(&frame)?;
//! engine.close();
//! # Ok::<(), smart_turn::EngineError>(())
//! ```

pub mod audio;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod inference;
pub mod prelude;

pub use audio::turn::TurnPrediction;
pub use callbacks::Callbacks;
pub use config::{Config, REQUIRED_CHUNK_SIZE, REQUIRED_SAMPLE_RATE};
pub use engine::Engine;
pub use error::{ConfigError, EngineError};
pub use inference::{InferenceError, InferenceRuntime, OrtRuntime};
