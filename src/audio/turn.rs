// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Turn-completion classification.
//!
//! Decides whether a finalized speech segment ends a conversational turn
//! or is just a pause. The segment is converted to the 80x800 log-mel
//! representation and run through the turn model for a single
//! completion probability.

use serde::{Deserialize, Serialize};

use crate::audio::mel::MelExtractor;
use crate::error::EngineError;
use crate::inference::InferenceRuntime;

/// Probability above which a segment is considered a complete turn.
const COMPLETE_THRESHOLD: f32 = 0.5;

/// Outcome of turn-completion inference on one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnPrediction {
    /// Whether the model considers the turn finished.
    pub complete: bool,
    /// The underlying completion probability.
    pub probability: f32,
}

/// Turn-completion classifier. Owns the feature extractor; the inference
/// session lives in the runtime.
pub struct TurnClassifier {
    mel: MelExtractor,
}

impl TurnClassifier {
    pub fn new() -> Self {
        Self {
            mel: MelExtractor::new(),
        }
    }

    /// Classify a finalized segment.
    ///
    /// The segment is truncated to its last 8 seconds or left-padded
    /// inside the feature extractor. Fails with
    /// [`EngineError::InvalidSegment`] on empty input; inference failures
    /// are passed through.
    pub fn classify(
        &mut self,
        runtime: &mut dyn InferenceRuntime,
        segment: &[f32],
    ) -> Result<TurnPrediction, EngineError> {
        let features = self
            .mel
            .compute(segment)
            .ok_or(EngineError::InvalidSegment)?;
        let (data, _) = features.into_raw_vec_and_offset();
        let probability = runtime.run_turn(&data)?;
        Ok(TurnPrediction {
            complete: probability > COMPLETE_THRESHOLD,
            probability,
        })
    }
}

impl Default for TurnClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TurnClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnClassifier").finish_non_exhaustive()
    }
}
