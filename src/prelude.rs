// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Convenience re-exports for typical embedders.

pub use crate::audio::turn::TurnPrediction;
pub use crate::callbacks::Callbacks;
pub use crate::config::{Config, REQUIRED_CHUNK_SIZE, REQUIRED_SAMPLE_RATE};
pub use crate::engine::Engine;
pub use crate::error::{ConfigError, EngineError};
pub use crate::inference::{InferenceError, InferenceRuntime};
