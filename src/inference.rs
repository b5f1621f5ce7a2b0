// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Inference runtime abstraction and the ONNX Runtime implementation.
//!
//! The engine talks to its neural networks through [`InferenceRuntime`], a
//! narrow two-method trait. [`OrtRuntime`] implements it over two ONNX
//! Runtime sessions; tests substitute scripted fakes.

use std::path::Path;
use std::sync::OnceLock;

use ndarray::{Array1, Array2, Array3};
use ort::session::Session;
use ort::value::Tensor;

use crate::audio::mel::{MEL_FRAMES, N_MELS};
use crate::audio::vad::silero::{VAD_INPUT_SAMPLES, VAD_STATE_LEN};

/// Sample-rate scalar passed to the VAD model on every call.
const VAD_SAMPLE_RATE: i64 = 16000;

/// Errors from the inference runtime.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("unexpected tensor shape: {0}")]
    Shape(String),
    /// Opaque failure from a non-ONNX backend.
    #[error("{0}")]
    Backend(String),
}

/// Maps input tensors to output tensors for the two models the engine runs.
///
/// Implementations are free to block; the engine calls them inline from
/// `push_pcm` and never from another thread.
pub trait InferenceRuntime {
    /// Run the VAD network.
    ///
    /// `input` is the 576-sample context-plus-frame vector; `state` is the
    /// 256-float (2x1x128) recurrent state, which the runtime must
    /// overwrite in place with the next state. Returns the speech
    /// probability in `[0.0, 1.0]`.
    fn run_vad(&mut self, input: &[f32], state: &mut [f32]) -> Result<f32, InferenceError>;

    /// Run the turn-completion network on a 64,000-float (80x800) log-mel
    /// feature tensor. Returns the completion probability.
    fn run_turn(&mut self, features: &[f32]) -> Result<f32, InferenceError>;
}

/// Initialize the process-wide ONNX Runtime environment once.
///
/// Later calls return the recorded outcome of the first attempt. Teardown
/// is left to process exit.
fn ensure_initialized() -> Result<(), InferenceError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();
    INIT.get_or_init(|| {
        ort::init()
            .with_name("smart-turn")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .clone()
    .map_err(InferenceError::Backend)
}

/// ONNX Runtime implementation holding one session per model.
pub struct OrtRuntime {
    vad_session: Session,
    turn_session: Session,
}

impl OrtRuntime {
    /// Load both models from local ONNX files.
    pub fn load(vad_model: &Path, turn_model: &Path) -> Result<Self, InferenceError> {
        ensure_initialized()?;
        let vad_session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(vad_model)?;
        let turn_session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(turn_model)?;
        Ok(Self {
            vad_session,
            turn_session,
        })
    }
}

impl InferenceRuntime for OrtRuntime {
    fn run_vad(&mut self, input: &[f32], state: &mut [f32]) -> Result<f32, InferenceError> {
        if input.len() != VAD_INPUT_SAMPLES {
            return Err(InferenceError::Shape(format!(
                "expected {} input samples, got {}",
                VAD_INPUT_SAMPLES,
                input.len()
            )));
        }
        if state.len() != VAD_STATE_LEN {
            return Err(InferenceError::Shape(format!(
                "expected {} state values, got {}",
                VAD_STATE_LEN,
                state.len()
            )));
        }

        // input: [1, 576]
        let input_array = Array2::from_shape_vec((1, VAD_INPUT_SAMPLES), input.to_vec())
            .map_err(|e| InferenceError::Shape(e.to_string()))?;
        let input_value = Tensor::from_array(input_array)?;

        // state: [2, 1, 128], carried from the previous call
        let state_array = Array3::from_shape_vec((2, 1, 128), state.to_vec())
            .map_err(|e| InferenceError::Shape(e.to_string()))?;
        let state_value = Tensor::from_array(state_array)?;

        // sr: [1]
        let sr_value = Tensor::from_array(Array1::from_vec(vec![VAD_SAMPLE_RATE]))?;

        let outputs = self.vad_session.run(ort::inputs![
            "input" => input_value,
            "state" => state_value,
            "sr" => sr_value,
        ])?;

        let probability = outputs["output"]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);

        // Copy the next recurrent state over the current one.
        let next_state = outputs["stateN"].try_extract_array::<f32>()?;
        for (dst, src) in state.iter_mut().zip(next_state.iter()) {
            *dst = *src;
        }

        Ok(probability)
    }

    fn run_turn(&mut self, features: &[f32]) -> Result<f32, InferenceError> {
        if features.len() != N_MELS * MEL_FRAMES {
            return Err(InferenceError::Shape(format!(
                "expected {} feature values, got {}",
                N_MELS * MEL_FRAMES,
                features.len()
            )));
        }

        // input_features: [1, 80, 800]
        let input_array = Array3::from_shape_vec((1, N_MELS, MEL_FRAMES), features.to_vec())
            .map_err(|e| InferenceError::Shape(e.to_string()))?;
        let input_value = Tensor::from_array(input_array)?;

        let outputs = self
            .turn_session
            .run(ort::inputs!["input_features" => input_value])?;

        let probability = outputs["output"]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);

        Ok(probability)
    }
}

impl std::fmt::Debug for OrtRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtRuntime").finish_non_exhaustive()
    }
}
