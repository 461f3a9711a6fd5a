//! Engine errors

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use thiserror::Error;

/// Configuration problems found by `EngineConfig::validate()`.
///
/// The audio path itself never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    #[error("filter stage {stage}: cutoff {cutoff} Hz is not between 0 and {nyquist} Hz")]
    CutoffOutOfRange {
        stage: usize,
        cutoff: f32,
        nyquist: f32,
    },

    #[error("filter stage {stage}: Q must be greater than 0 (got {q})")]
    InvalidQ { stage: usize, q: f32 },
}
