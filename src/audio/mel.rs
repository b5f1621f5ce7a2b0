// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Log-mel feature extraction for turn-completion preprocessing.
//!
//! Computes log-mel spectrograms matching the Whisper feature-extractor
//! contract the turn model was trained against:
//! - 80 mel filterbank bins over 0-8000 Hz
//! - 400-sample FFT window (25ms at 16kHz)
//! - 160-sample hop length (10ms stride at 16kHz)
//! - periodic Hann window
//! - per-window waveform normalization, log scale, dynamic-range
//!   compression and `(x + 4) / 4` scaling

use std::sync::Arc;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// FFT window size (25ms at 16kHz).
const N_FFT: usize = 400;
/// Hop length (10ms stride at 16kHz).
const HOP_LENGTH: usize = 160;
/// Number of frequency bins kept from the real FFT.
const N_FREQS: usize = N_FFT / 2 + 1; // 201
/// Number of mel filterbank bins.
pub const N_MELS: usize = 80;
/// Feature frames per extraction (8 seconds at hop 160).
pub const MEL_FRAMES: usize = 800;
/// Analysis window in samples (8 seconds at 16kHz).
pub const MEL_WINDOW_SAMPLES: usize = 128_000;
/// Expected sample rate.
const SAMPLE_RATE: f64 = 16000.0;

/// Compute the periodic Hann window of the given size.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = std::f64::consts::PI * 2.0 * i as f64 / size as f64;
            (0.5 * (1.0 - x.cos())) as f32
        })
        .collect()
}

/// Convert frequency in Hz to mel scale (HTK formula).
fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel scale to frequency in Hz (HTK formula).
fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Build the triangular mel filterbank, flattened row-major to
/// `[N_MELS * N_FREQS]`.
///
/// Mel points are linearly spaced between mel(0) and mel(8000); bin
/// centers are linearly spaced in Hz over [0, 8000].
fn mel_filterbank() -> Vec<f32> {
    let mel_low = hz_to_mel(0.0);
    let mel_high = hz_to_mel(SAMPLE_RATE / 2.0);

    let n_points = N_MELS + 2;
    let hz_points: Vec<f64> = (0..n_points)
        .map(|i| mel_to_hz(mel_low + (mel_high - mel_low) * i as f64 / (n_points - 1) as f64))
        .collect();

    let bin_freq: Vec<f64> = (0..N_FREQS)
        .map(|k| k as f64 * SAMPLE_RATE / (2.0 * (N_FREQS - 1) as f64))
        .collect();

    let mut filters = vec![0.0f32; N_MELS * N_FREQS];
    for m in 0..N_MELS {
        let left = hz_points[m];
        let center = hz_points[m + 1];
        let right = hz_points[m + 2];
        for (k, &freq) in bin_freq.iter().enumerate() {
            let weight = if freq >= left && freq <= center && center > left {
                (freq - left) / (center - left)
            } else if freq > center && freq <= right && right > center {
                (right - freq) / (right - center)
            } else {
                0.0
            };
            filters[m * N_FREQS + k] = weight as f32;
        }
    }
    filters
}

/// Log-mel feature extractor.
///
/// The Hann window, filterbank, FFT plan and scratch buffers are computed
/// once and reused across calls; every dimension is constant.
pub struct MelExtractor {
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    filterbank: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    power: Vec<f32>,
}

impl MelExtractor {
    pub fn new() -> Self {
        Self {
            fft: FftPlanner::new().plan_fft_forward(N_FFT),
            hann: hann_window(N_FFT),
            filterbank: mel_filterbank(),
            fft_buffer: vec![Complex::new(0.0, 0.0); N_FFT],
            power: vec![0.0; N_FREQS],
        }
    }

    /// Compute log-mel features from mono 16kHz f32 samples.
    ///
    /// Audio is truncated to its last 8 seconds or left-padded with zeros
    /// to exactly 8 seconds, then normalized to zero mean and unit
    /// variance before analysis. Returns the `[80, 800]` feature matrix,
    /// or `None` if `audio` is empty.
    pub fn compute(&mut self, audio: &[f32]) -> Option<Array2<f32>> {
        if audio.is_empty() {
            return None;
        }

        // Keep the last 8 seconds; shorter input is left-padded with zeros.
        let tail = if audio.len() > MEL_WINDOW_SAMPLES {
            &audio[audio.len() - MEL_WINDOW_SAMPLES..]
        } else {
            audio
        };

        // Single-pass mean/variance over the selected window. The
        // normalization applies to the real audio only; padding stays zero.
        let n = tail.len() as f64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &x in tail {
            let x = x as f64;
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0).max(1e-7);
        let inv_std = 1.0 / variance.sqrt();

        let mut padded = vec![0.0f32; MEL_WINDOW_SAMPLES];
        let offset = MEL_WINDOW_SAMPLES - tail.len();
        for (dst, &x) in padded[offset..].iter_mut().zip(tail) {
            *dst = ((x as f64 - mean) * inv_std) as f32;
        }

        let mut mel = Array2::<f32>::zeros((N_MELS, MEL_FRAMES));
        let power_norm = (N_FFT * N_FFT) as f32;

        for t in 0..MEL_FRAMES {
            let start = t * HOP_LENGTH;
            if start + N_FFT > MEL_WINDOW_SAMPLES {
                // The last frames would read past the buffer; their
                // columns stay at the spectral floor.
                break;
            }

            for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.hann[i], 0.0);
            }
            self.fft.process(&mut self.fft_buffer);

            for (k, p) in self.power.iter_mut().enumerate() {
                *p = self.fft_buffer[k].norm_sqr() / power_norm;
            }

            for m in 0..N_MELS {
                let filter = &self.filterbank[m * N_FREQS..(m + 1) * N_FREQS];
                let mut sum = 0.0f32;
                for (w, p) in filter.iter().zip(self.power.iter()) {
                    sum += w * p;
                }
                mel[[m, t]] = sum;
            }
        }

        // Log scale, dynamic-range compression to 8 decades below the
        // peak, then rescale.
        mel.mapv_inplace(|v| v.max(1e-10).log10());
        let max_val = mel.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max_val - 8.0;
        mel.mapv_inplace(|v| (v.max(floor) + 4.0) / 4.0);

        Some(mel)
    }
}

impl Default for MelExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_properties() {
        let w = hann_window(N_FFT);
        assert_eq!(w.len(), N_FFT);
        // Periodic Hann starts at 0 and peaks at the midpoint.
        assert!(w[0].abs() < 1e-6);
        assert!((w[N_FFT / 2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mel_filterbank_shape_and_sign() {
        let fb = mel_filterbank();
        assert_eq!(fb.len(), N_MELS * N_FREQS);
        for &v in &fb {
            assert!(v >= 0.0, "mel filter values must be non-negative");
        }
    }

    #[test]
    fn test_hz_mel_roundtrip() {
        let hz = 1000.0;
        let back = mel_to_hz(hz_to_mel(hz));
        assert!((hz - back).abs() < 1e-6);
    }

    #[test]
    fn test_compute_empty_is_none() {
        let mut mel = MelExtractor::new();
        assert!(mel.compute(&[]).is_none());
    }

    #[test]
    fn test_compute_dimensions() {
        let mut mel = MelExtractor::new();
        for len in [100, 16000, MEL_WINDOW_SAMPLES, MEL_WINDOW_SAMPLES + 5000] {
            let audio = vec![0.25f32; len];
            let result = mel.compute(&audio).unwrap();
            assert_eq!(result.dim(), (N_MELS, MEL_FRAMES));
        }
    }

    #[test]
    fn test_compute_silence_is_uniform_floor() {
        // All-zero input normalizes to all zeros, so every mel value sits
        // on the 1e-10 spectral floor: (log10(1e-10) + 4) / 4 = -1.5.
        let mut mel = MelExtractor::new();
        let silence = vec![0.0f32; 16000];
        let result = mel.compute(&silence).unwrap();
        for &v in result.iter() {
            assert!((v - (-1.5)).abs() < 1e-6, "expected -1.5, got {v}");
        }
    }

    #[test]
    fn test_compute_value_range() {
        // After compression the spread is at most 8 decades, which maps to
        // a span of 2.0 after the (x + 4) / 4 rescale.
        let mut mel = MelExtractor::new();
        let audio: Vec<f32> = (0..32000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let result = mel.compute(&audio).unwrap();
        let max = result.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = result.iter().copied().fold(f32::INFINITY, f32::min);
        assert!(max - min <= 2.0 + 1e-5);
    }

    #[test]
    fn test_compute_gain_invariance() {
        // Waveform normalization makes the features invariant to input
        // gain.
        let mut mel = MelExtractor::new();
        let audio: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let quiet: Vec<f32> = audio.iter().map(|x| x * 0.05).collect();

        let loud_mel = mel.compute(&audio).unwrap();
        let quiet_mel = mel.compute(&quiet).unwrap();
        for (a, b) in loud_mel.iter().zip(quiet_mel.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_compute_truncates_to_last_window() {
        // Overlong input must use the trailing 8 seconds only.
        let mut mel = MelExtractor::new();
        let long: Vec<f32> = (0..MEL_WINDOW_SAMPLES + 7000)
            .map(|i| ((i % 97) as f32 / 97.0) - 0.5)
            .collect();
        let tail = long[long.len() - MEL_WINDOW_SAMPLES..].to_vec();

        let from_long = mel.compute(&long).unwrap();
        let from_tail = mel.compute(&tail).unwrap();
        for (a, b) in from_long.iter().zip(from_tail.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_compute_sine_has_energy_peak() {
        let mut mel = MelExtractor::new();
        let audio: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let result = mel.compute(&audio).unwrap();
        let max = result.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max > -1.0, "sine input should rise above the floor");
    }
}
