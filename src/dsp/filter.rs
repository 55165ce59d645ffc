//! Band-pass biquad post-filter.
//!
//! One second-order IIR section applied causally in a single pass over the
//! fully mixed buffer. Coefficient formulas follow the Audio EQ Cookbook
//! (Robert Bristow-Johnson) band-pass derivation.

use std::f64::consts::PI;

/// Second-order band-pass filter, Direct Form I.
///
/// Coefficients are kept un-normalized and the difference equation divides
/// by `a0` explicitly:
///
/// `y[n] = (b0*x[n] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]) / a0`
///
/// (`b1` is identically zero for the band-pass section.)
#[derive(Debug, Clone)]
pub struct BandPass {
    b0: f64,
    b2: f64,
    a0: f64,
    a1: f64,
    a2: f64,

    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BandPass {
    /// Filter centered at the geometric mean of the band edges.
    pub fn new(low_hz: f64, high_hz: f64, q: f64, sample_rate: f64) -> Self {
        let center = (low_hz * high_hz).sqrt();
        let w0 = 2.0 * PI * center / sample_rate;
        let alpha = w0.sin() / (2.0 * q);

        BandPass {
            b0: alpha,
            b2: -alpha,
            a0: 1.0 + alpha,
            a1: -2.0 * w0.cos(),
            a2: 1.0 - alpha,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Process a single sample.
    pub fn process(&mut self, input: f64) -> f64 {
        let output =
            (self.b0 * input + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2)
                / self.a0;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Filter the whole buffer in place, state carried sample to sample
    /// across the entire pass.
    pub fn apply(&mut self, samples: &mut [f64]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
