//! Engine configuration

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::errors::ConfigError;
use crate::svf::SvfCoefficients;

use serde::{Deserialize, Serialize};

/// One pre-filter section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStage {
    /// Hz
    pub cutoff: f32,
    pub q: f32,
}

impl FilterStage {
    pub const fn new(cutoff: f32, q: f32) -> Self {
        Self { cutoff, q }
    }

    pub fn coefficients(&self, sample_rate: f32) -> SvfCoefficients {
        SvfCoefficients::new(self.cutoff, self.q, sample_rate)
    }
}

/// The pre-filter is one or two cascaded two-pole sections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCascade {
    Single(FilterStage),
    Double([FilterStage; 2]),
}

impl FilterCascade {
    pub fn stages(&self) -> &[FilterStage] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Double(s) => s,
        }
    }
}

/// Conversion factor between audio samples and the engine's fixed-point samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedPointScale {
    X2048,
    X4096,
}

impl FixedPointScale {
    pub const fn factor(self) -> f32 {
        match self {
            Self::X2048 => 2048.0,
            Self::X4096 => 4096.0,
        }
    }

    /// Truncates towards zero and saturates to the 16-bit ADC cell.
    /// NaN is converted to 0.
    ///
    /// The value is not clamped to the 12-bit sample range, a full-scale input
    /// produces `factor()`.
    #[inline]
    pub fn to_fixed(self, sample: f32) -> i16 {
        // float to int `as` casts saturate
        (sample * self.factor()) as i16
    }

    #[inline]
    pub fn to_sample(self, value: i16) -> f32 {
        f32::from(value) / self.factor()
    }
}

/// How often the interpreter runs, relative to the host's frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCadence {
    /// One interpreter pass per frame.
    EveryFrame,
    /// One interpreter pass per pair of frames.
    /// The output is held (duplicated) for the second frame of the pair.
    EveryOtherFrame,
}

impl OutputCadence {
    pub const fn frames_per_pass(self) -> u32 {
        match self {
            Self::EveryFrame => 1,
            Self::EveryOtherFrame => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pre_filter: FilterCascade,
    pub scale: FixedPointScale,
    pub cadence: OutputCadence,
}

impl EngineConfig {
    /// Two pre-filter sections and a half-rate interpreter, like the hardware unit.
    pub const MIDIVERB: Self = Self {
        pre_filter: FilterCascade::Double([
            FilterStage::new(5916.0, 0.6572),
            FilterStage::new(9458.0, 2.536),
        ]),
        scale: FixedPointScale::X2048,
        cadence: OutputCadence::EveryOtherFrame,
    };

    pub const FULL_RATE: Self = Self {
        pre_filter: FilterCascade::Single(FilterStage::new(8000.0, 0.7071)),
        scale: FixedPointScale::X4096,
        cadence: OutputCadence::EveryFrame,
    };

    pub fn validate(&self, sample_rate: f32) -> Result<(), ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }

        let nyquist = sample_rate / 2.0;

        for (stage, s) in self.pre_filter.stages().iter().enumerate() {
            if !(s.cutoff > 0.0 && s.cutoff < nyquist) {
                return Err(ConfigError::CutoffOutOfRange {
                    stage,
                    cutoff: s.cutoff,
                    nyquist,
                });
            }
            if !(s.q.is_finite() && s.q > 0.0) {
                return Err(ConfigError::InvalidQ { stage, q: s.q });
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::MIDIVERB
    }
}
