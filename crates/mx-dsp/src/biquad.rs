//! Second-order IIR sections
//!
//! Direct Form 1 biquads with normalized coefficients (a0 = 1). Only the
//! designs the loudness meter needs live here: the two ITU-R BS.1770-4
//! K-weighting stages and a bypass section.

use mx_core::Sample;
use std::f64::consts::PI;

/// Normalized biquad coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Unity passthrough.
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// BS.1770-4 stage 1: high-frequency shelving boost modelling the
    /// acoustic response of the head.
    pub fn k_weighting_pre_filter(sample_rate: f64) -> Self {
        let f0 = 1681.974450955533;
        let g = 3.999843853973347;
        let q = 0.7071752369554196;

        let k = (PI * f0 / sample_rate).tan();
        let vh = 10.0_f64.powf(g / 20.0);
        let vb = vh.powf(0.4996667741545416);

        let a0 = 1.0 + k / q + k * k;

        Self {
            b0: (vh + vb * k / q + k * k) / a0,
            b1: 2.0 * (k * k - vh) / a0,
            b2: (vh - vb * k / q + k * k) / a0,
            a1: 2.0 * (k * k - 1.0) / a0,
            a2: (1.0 - k / q + k * k) / a0,
        }
    }

    /// BS.1770-4 stage 2: RLB weighting (high-pass shelf rolling off the
    /// low end).
    pub fn k_weighting_high_shelf(sample_rate: f64) -> Self {
        let f0 = 38.13547087602444;
        let q = 0.5003270373238773;

        let k = (PI * f0 / sample_rate).tan();
        let sqrt2 = std::f64::consts::SQRT_2;

        let a0 = 1.0 + k / q + k * k;

        Self {
            b0: (1.0 + sqrt2 * k + k * k) / a0,
            b1: 2.0 * (k * k - 1.0) / a0,
            b2: (1.0 - sqrt2 * k + k * k) / a0,
            a1: 2.0 * (k * k - 1.0) / a0,
            a2: (1.0 - k / q + k * k) / a0,
        }
    }
}

/// Direct Form 1 biquad with two samples of input and output memory.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replace the coefficients, keeping the delay state.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, input: Sample) -> Sample {
        let c = self.coeffs;
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clear the delay memory. Coefficients are untouched.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
