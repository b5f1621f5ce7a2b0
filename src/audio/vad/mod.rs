// Copyright (c) 2026, the smart-turn authors
// SPDX-License-Identifier: BSD-2-Clause

//! Voice Activity Detection (VAD) subsystem.

pub mod silero;

pub use silero::SileroVad;
