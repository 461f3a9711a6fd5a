//! Two-pole state-variable lowpass filter

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use std::f32::consts::PI;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SvfCoefficients {
    pub c1: f32,
    pub c2: f32,
    pub d0: f32,
}

impl SvfCoefficients {
    /// Frequency-warped SVF coefficients (corrected form by Fons Adriaensen).
    ///
    /// Preconditions (not checked):
    ///  * `sample_rate > 0`
    ///  * `0 < cutoff < sample_rate / 2`
    ///  * `q > 0`
    ///
    /// Breaking them produces non-finite coefficients.
    /// `EngineConfig::validate()` tests them outside of the audio path.
    pub fn new(cutoff: f32, q: f32, sample_rate: f32) -> Self {
        let w = 2.0 * (PI * (cutoff / sample_rate)).tan();
        let a = w / q;
        let b = w * w;

        let c1 = (a + b) / (1.0 + a / 2.0 + b / 4.0);
        let c2 = b / (a + b);
        let d0 = c1 * c2 / 4.0;

        Self { c1, c2, d0 }
    }

    pub fn is_finite(&self) -> bool {
        self.c1.is_finite() && self.c2.is_finite() && self.d0.is_finite()
    }
}

#[derive(Debug, Default, Clone)]
pub struct TwoPoleLowpass {
    coefficients: SvfCoefficients,
    z1: f32,
    z2: f32,
}

impl TwoPoleLowpass {
    pub fn new(coefficients: SvfCoefficients) -> Self {
        Self {
            coefficients,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn coefficients(&self) -> SvfCoefficients {
        self.coefficients
    }

    /// Also clears the filter state.
    pub fn set_coefficients(&mut self, coefficients: SvfCoefficients) {
        self.coefficients = coefficients;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub fn state(&self) -> (f32, f32) {
        (self.z1, self.z2)
    }

    #[inline]
    pub fn step(&mut self, x: f32) -> f32 {
        let SvfCoefficients { c1, c2, d0 } = self.coefficients;

        let e = x - self.z1 - self.z2;
        self.z2 += c2 * self.z1;
        self.z1 += c1 * e;

        d0 * e + self.z2
    }
}
