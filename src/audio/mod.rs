//! Audio conditioning pipeline for the page turner.
//!
//! Raw PCM blocks arrive from the acquisition queue, are band-limited by a
//! cascade of biquads at the input rate, collected into a sliding window and
//! resampled to the classifier rate (16 kHz mono i16).

/// Classifier sample rate.
pub const TARGET_RATE: u32 = 16_000;

/// Sample rate delivered by the firmware's audio shield.
pub const DEVICE_RATE: u32 = 44_100;

/// Largest magnitude any rescale path may produce. The negative extreme is
/// clamped too so the range stays symmetric.
pub const SAMPLE_LIMIT: f32 = 32_767.0;

const NORMALIZE: f32 = 32_768.0;

mod acquisition;
mod biquad;
mod dispatch;
mod energy;
mod filter_chain;
mod recorder;
mod resample;

pub use acquisition::AcquisitionBuffer;
pub use biquad::{BiquadCoefficients, BiquadKind, BiquadSection};
pub use dispatch::{block_queue, BlockProducer, BlockQueue, BlockSource};
pub use energy::{rms, rms_db, EnergyGate};
pub use filter_chain::{FilterChain, FilterProfile};
pub use recorder::Recorder;
pub(crate) use resample::{MAX_DEVICE_RATE, MIN_DEVICE_RATE};
pub use resample::{output_len, ResampleMethod, Resampler};

/// Map an i16 sample into [-1, 1).
#[inline]
pub fn normalize(sample: i16) -> f32 {
    f32::from(sample) / NORMALIZE
}

/// Rescale a normalized value back to PCM, saturating instead of wrapping.
#[inline]
pub fn denormalize(value: f32) -> i16 {
    saturate(value * NORMALIZE)
}

/// Round and clamp to the symmetric i16 range. NaN maps to 0.
#[inline]
pub fn saturate(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(-SAMPLE_LIMIT, SAMPLE_LIMIT) as i16
}
