use super::{saturate, SAMPLE_LIMIT};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// Practical bounds for microphone hardware; validation rejects anything outside.
pub(crate) const MIN_DEVICE_RATE: u32 = 2_000;
pub(crate) const MAX_DEVICE_RATE: u32 = 192_000;

const Q16_ONE: u64 = 1 << 16;

/// Interpolation strategy used to move a window to the classifier rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleMethod {
    /// Equal-weight average of up to three neighbours around the source position.
    ThreeTap,
    /// Floating-point linear interpolation.
    Linear,
    /// Linear interpolation with a Q16.16 position accumulator.
    LinearFixed,
}

impl ResampleMethod {
    pub fn label(self) -> &'static str {
        match self {
            ResampleMethod::ThreeTap => "three-tap",
            ResampleMethod::Linear => "linear",
            ResampleMethod::LinearFixed => "linear-fixed",
        }
    }
}

/// `round(n * output_rate / input_rate)` clamped to `max_len`. Depends only on
/// the lengths and rates, never on sample values.
pub fn output_len(n: usize, input_rate: u32, output_rate: u32, max_len: usize) -> usize {
    if n == 0 || input_rate == 0 {
        return 0;
    }
    let exact = (n as f64) * f64::from(output_rate) / f64::from(input_rate);
    (exact.round() as usize).min(max_len)
}

/// Fixed-ratio resampler. Holds no filter state; aliasing suppression happens
/// in the filter chain before samples reach it.
#[derive(Debug, Clone)]
pub struct Resampler {
    method: ResampleMethod,
    input_rate: u32,
    output_rate: u32,
    max_output: usize,
}

impl Resampler {
    pub fn new(
        method: ResampleMethod,
        input_rate: u32,
        output_rate: u32,
        max_output: usize,
    ) -> Self {
        Self {
            method,
            input_rate,
            output_rate,
            max_output,
        }
    }

    pub fn method(&self) -> ResampleMethod {
        self.method
    }

    pub fn max_output(&self) -> usize {
        self.max_output
    }

    pub fn output_len(&self, n: usize) -> usize {
        output_len(n, self.input_rate, self.output_rate, self.max_output)
    }

    /// Replace the contents of `out` with the resampled block.
    pub fn process_into(&self, input: &[i16], out: &mut Vec<i16>) {
        out.clear();
        let len = self.output_len(input.len());
        if len == 0 {
            return;
        }
        out.reserve(len);
        if self.input_rate == self.output_rate {
            out.extend(input[..len].iter().map(|&s| clamp_i16(s)));
            return;
        }
        match self.method {
            ResampleMethod::ThreeTap => self.three_tap(input, len, out),
            ResampleMethod::Linear => self.linear(input, len, out),
            ResampleMethod::LinearFixed => self.linear_fixed(input, len, out),
        }
    }

    pub fn process(&self, input: &[i16]) -> Vec<i16> {
        let mut out = Vec::new();
        self.process_into(input, &mut out);
        out
    }

    fn source_position(&self, j: usize) -> f64 {
        j as f64 * f64::from(self.input_rate) / f64::from(self.output_rate)
    }

    fn three_tap(&self, input: &[i16], len: usize, out: &mut Vec<i16>) {
        let n = input.len() as i64;
        for j in 0..len {
            let centre = self.source_position(j).floor() as i64;
            let mut sum = 0.0f32;
            let mut taps = 0u32;
            // Out-of-range neighbours are skipped, not zero-padded.
            for idx in (centre - 1)..=(centre + 1) {
                if (0..n).contains(&idx) {
                    sum += f32::from(input[idx as usize]);
                    taps += 1;
                }
            }
            let value = if taps == 0 { 0.0 } else { sum / taps as f32 };
            out.push(saturate(value));
        }
    }

    fn linear(&self, input: &[i16], len: usize, out: &mut Vec<i16>) {
        let last = input.len() - 1;
        for j in 0..len {
            let pos = self.source_position(j);
            let idx = pos.floor() as usize;
            if idx >= last {
                out.push(clamp_i16(input[last]));
                continue;
            }
            let frac = pos - idx as f64;
            let x0 = f64::from(input[idx]);
            let x1 = f64::from(input[idx + 1]);
            out.push(saturate((x0 + (x1 - x0) * frac) as f32));
        }
    }

    fn linear_fixed(&self, input: &[i16], len: usize, out: &mut Vec<i16>) {
        let last = input.len() - 1;
        let step = (u64::from(self.input_rate) << 16) / u64::from(self.output_rate);
        let mut pos = 0u64;
        for _ in 0..len {
            let idx = (pos >> 16) as usize;
            if idx >= last {
                out.push(clamp_i16(input[last]));
            } else {
                let frac = (pos & (Q16_ONE - 1)) as i64;
                let x0 = i64::from(input[idx]);
                let x1 = i64::from(input[idx + 1]);
                let v = x0 + (((x1 - x0) * frac) >> 16);
                out.push(v.clamp(-(SAMPLE_LIMIT as i64), SAMPLE_LIMIT as i64) as i16);
            }
            pos += step;
        }
    }
}

#[inline]
fn clamp_i16(sample: i16) -> i16 {
    sample.max(-(SAMPLE_LIMIT as i16))
}
