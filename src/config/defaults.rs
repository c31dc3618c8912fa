use crate::audio::{FilterProfile, ResampleMethod, DEVICE_RATE, TARGET_RATE};

pub const DEFAULT_INPUT_RATE: u32 = DEVICE_RATE;
pub const DEFAULT_OUTPUT_RATE: u32 = TARGET_RATE;
pub const DEFAULT_WINDOW_MS: u64 = 1_000;
/// Matches the audio library's block size on the firmware.
pub const DEFAULT_BLOCK_SAMPLES: usize = 128;
/// Enough depth to ride out a full hold decision plus a slow classifier call.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

pub const DEFAULT_HIGHPASS_HZ: f32 = 300.0;
pub const DEFAULT_LOWPASS_HZ: f32 = 3_400.0;
pub const DEFAULT_FILTER_Q: f32 = 0.707;

/// RMS of normalized samples; roughly the firmware's 0.0002 mean-square gate.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.015;
pub const DEFAULT_RUN_LENGTH: u32 = 3;
pub const DEFAULT_REFRACTORY_MS: u64 = 1_500;
pub const DEFAULT_INFERENCE_INTERVAL_MS: u64 = 20;

pub const DEFAULT_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_HOLD_MS: u64 = 1_000;
pub const DEFAULT_WATCHDOG_MS: u64 = 2_000;
pub const DEFAULT_STARVATION_MS: u64 = 2_000;

pub const DEFAULT_CMD_AUDIO_WINDOW: u8 = 0xA1;
pub const DEFAULT_CMD_SCORES: u8 = 0xA2;
pub const DEFAULT_CMD_STREAM: u8 = 0xA3;

pub const DEFAULT_NEXT_LABELS: &[&str] = &["weiter", "next"];
pub const DEFAULT_PREV_LABELS: &[&str] = &["zurück", "back"];
pub const DEFAULT_SILENCE_LABEL: &str = "silence";

pub(super) const MAX_WINDOW_MS: u64 = 4_000;
pub(super) const MAX_LABELS: usize = 64;
pub(super) const MAX_CLASSIFIER_ARGS: usize = 32;

pub fn default_filter_profile() -> FilterProfile {
    FilterProfile::SpeechBand
}

pub fn default_resampler() -> ResampleMethod {
    ResampleMethod::ThreeTap
}

pub(super) fn default_next_labels() -> Vec<String> {
    DEFAULT_NEXT_LABELS.iter().map(|s| s.to_string()).collect()
}

pub(super) fn default_prev_labels() -> Vec<String> {
    DEFAULT_PREV_LABELS.iter().map(|s| s.to_string()).collect()
}
