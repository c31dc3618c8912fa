//! Second-order IIR sections designed with the RBJ audio-EQ cookbook.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Response shape of a single section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiquadKind {
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain band-pass.
    BandPass,
}

impl BiquadKind {
    pub fn label(self) -> &'static str {
        match self {
            BiquadKind::LowPass => "low_pass",
            BiquadKind::HighPass => "high_pass",
            BiquadKind::BandPass => "band_pass",
        }
    }
}

/// Coefficients normalized by `a0`, so `a0` is implicitly 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Derive coefficients for `kind` at `sample_rate` with corner/centre `cutoff` and quality `q`.
    ///
    /// The design runs in f64; low corners relative to `sample_rate` put
    /// `cos(w0)` within f32 rounding of 1.0.
    pub fn design(kind: BiquadKind, sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * f64::from(cutoff) / f64::from(sample_rate);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q));

        let (b0, b1, b2) = match kind {
            BiquadKind::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            BiquadKind::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            BiquadKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }

    /// Pass-through section.
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// True when both poles lie strictly inside the unit circle (stability triangle).
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// One biquad with its own delay line. State is owned exclusively by the section
/// and is only cleared when the section is (re)designed.
#[derive(Debug, Clone)]
pub struct BiquadSection {
    kind: BiquadKind,
    coeffs: BiquadCoefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadSection {
    pub fn new(kind: BiquadKind, sample_rate: f32, cutoff: f32, q: f32) -> Self {
        Self {
            kind,
            coeffs: BiquadCoefficients::design(kind, sample_rate, cutoff, q),
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Explicit re-tune: new coefficients and a cleared delay line.
    pub fn retune(&mut self, kind: BiquadKind, sample_rate: f32, cutoff: f32, q: f32) {
        self.kind = kind;
        self.coeffs = BiquadCoefficients::design(kind, sample_rate, cutoff, q);
        self.reset();
    }

    pub fn kind(&self) -> BiquadKind {
        self.kind
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    pub(crate) fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Direct form I step. NaN/Inf inputs propagate into the state; callers
    /// hand in normalized PCM, which is always finite.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
