// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Speech segmentation state machine.
//!
//! Pure logic, no inference and no callbacks: per-frame speech flags go
//! in, segment boundaries come out. A fixed ring of pre-speech frames is
//! prepended when a segment starts, trailing silence or a hard duration
//! cap ends it.

/// Upper bound on the pre-speech ring, in frames.
const MAX_PRE_CHUNKS: usize = 256;

/// Why a segment was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Enough consecutive non-speech frames accumulated.
    Silence,
    /// The segment hit the configured duration cap.
    MaxDuration,
}

/// Outcome of feeding one frame to the segmenter.
#[derive(Debug)]
pub enum StepEvent {
    /// Nothing changed: still idle, or the segment simply grew.
    None,
    /// This frame triggered a new segment. The live buffer now holds the
    /// pre-speech ring contents followed by the triggering frame.
    Started,
    /// The segment was finalized; ownership of its samples moves to the
    /// caller and all segmenter state is reset.
    Ended {
        reason: EndReason,
        segment: Vec<f32>,
    },
}

/// Segmentation state machine.
///
/// Frames are 512 samples; all thresholds are expressed in whole frames,
/// derived once from millisecond-based configuration.
pub struct Segmenter {
    chunk_size: usize,
    pre_chunks: usize,
    stop_chunks: usize,
    max_chunks: usize,

    /// Ring of recent idle frames, prepended to a starting segment.
    /// Slots are cleared on reset but keep their capacity.
    pre_buffer: Vec<Vec<f32>>,
    pre_buf_idx: usize,
    pre_buf_count: usize,

    segment: Vec<f32>,
    speech_active: bool,
    /// Consecutive non-speech frames since the last speech frame.
    trailing_chunks: usize,
    /// Frames since the segment was triggered, trigger included.
    since_trigger: usize,
}

fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

impl Segmenter {
    pub fn new(
        sample_rate: u32,
        chunk_size: usize,
        pre_speech_ms: u32,
        stop_ms: u32,
        max_duration_seconds: f32,
    ) -> Self {
        let frame_ms = ((1000 * chunk_size as u32) / sample_rate).max(1);
        let pre_chunks = (ceil_div(pre_speech_ms, frame_ms) as usize).clamp(1, MAX_PRE_CHUNKS);
        let stop_chunks = (ceil_div(stop_ms, frame_ms) as usize).max(1);
        let max_chunks =
            ((max_duration_seconds as f64 * sample_rate as f64 / chunk_size as f64) as usize)
                .max(1);

        Self {
            chunk_size,
            pre_chunks,
            stop_chunks,
            max_chunks,
            pre_buffer: vec![Vec::new(); pre_chunks],
            pre_buf_idx: 0,
            pre_buf_count: 0,
            segment: Vec::new(),
            speech_active: false,
            trailing_chunks: 0,
            since_trigger: 0,
        }
    }

    /// Advance the state machine by one frame.
    ///
    /// `chunk` must be exactly the configured frame size; anything else is
    /// ignored. Idle non-speech frames are retained in the pre-speech
    /// ring. A speech frame while idle starts a segment; once active,
    /// every frame is appended regardless of its flag until either the
    /// trailing-silence threshold or the duration cap fires. When both
    /// fire on the same frame, silence wins.
    pub fn step(&mut self, is_speech: bool, chunk: &[f32]) -> StepEvent {
        if chunk.len() != self.chunk_size {
            return StepEvent::None;
        }

        if !self.speech_active {
            if is_speech {
                self.speech_active = true;
                self.trailing_chunks = 0;
                self.since_trigger = 1;
                self.begin_segment(chunk);
                return StepEvent::Started;
            }
            let slot = &mut self.pre_buffer[self.pre_buf_idx];
            slot.clear();
            slot.extend_from_slice(chunk);
            self.pre_buf_idx = (self.pre_buf_idx + 1) % self.pre_chunks;
            if self.pre_buf_count < self.pre_chunks {
                self.pre_buf_count += 1;
            }
            return StepEvent::None;
        }

        self.segment.extend_from_slice(chunk);
        self.since_trigger += 1;
        if is_speech {
            self.trailing_chunks = 0;
        } else {
            self.trailing_chunks += 1;
        }

        if self.trailing_chunks >= self.stop_chunks {
            let segment = std::mem::take(&mut self.segment);
            self.reset();
            return StepEvent::Ended {
                reason: EndReason::Silence,
                segment,
            };
        }
        if self.since_trigger >= self.max_chunks {
            let segment = std::mem::take(&mut self.segment);
            self.reset();
            return StepEvent::Ended {
                reason: EndReason::MaxDuration,
                segment,
            };
        }
        StepEvent::None
    }

    /// Borrowed view of the live segment buffer, if a segment is active.
    pub fn segment(&self) -> Option<&[f32]> {
        if self.speech_active {
            Some(&self.segment)
        } else {
            None
        }
    }

    /// Whether a segment is currently being accumulated.
    pub fn is_active(&self) -> bool {
        self.speech_active
    }

    /// Finalize an in-flight segment without an end condition, handing its
    /// samples to the caller. Used for host-driven stop.
    pub fn take_segment(&mut self) -> Option<Vec<f32>> {
        if !self.speech_active {
            return None;
        }
        let segment = std::mem::take(&mut self.segment);
        self.reset();
        Some(segment)
    }

    /// Clear all state: ring slots emptied, counters zeroed, no active
    /// segment.
    pub fn reset(&mut self) {
        self.segment = Vec::new();
        self.speech_active = false;
        self.trailing_chunks = 0;
        self.since_trigger = 0;
        self.pre_buf_idx = 0;
        self.pre_buf_count = 0;
        for slot in &mut self.pre_buffer {
            slot.clear();
        }
    }

    /// Build the segment buffer from the ring (oldest first) plus the
    /// triggering frame.
    fn begin_segment(&mut self, trigger: &[f32]) {
        self.segment = Vec::with_capacity((self.pre_buf_count + 1) * self.chunk_size);
        let start = (self.pre_buf_idx + self.pre_chunks - self.pre_buf_count) % self.pre_chunks;
        for i in 0..self.pre_buf_count {
            let idx = (start + i) % self.pre_chunks;
            self.segment.extend_from_slice(&self.pre_buffer[idx]);
        }
        self.segment.extend_from_slice(trigger);
    }
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("speech_active", &self.speech_active)
            .field("pre_chunks", &self.pre_chunks)
            .field("stop_chunks", &self.stop_chunks)
            .field("max_chunks", &self.max_chunks)
            .field("since_trigger", &self.since_trigger)
            .field("trailing_chunks", &self.trailing_chunks)
            .finish()
    }
}
