//! Command-line parsing, deployment profiles and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use crate::audio::{FilterProfile, ResampleMethod};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::{
    default_filter_profile, default_resampler, DEFAULT_BLOCK_SAMPLES, DEFAULT_CMD_AUDIO_WINDOW,
    DEFAULT_CMD_SCORES, DEFAULT_CMD_STREAM, DEFAULT_DEBOUNCE_MS, DEFAULT_FILTER_Q,
    DEFAULT_HIGHPASS_HZ, DEFAULT_HOLD_MS, DEFAULT_INFERENCE_INTERVAL_MS, DEFAULT_INPUT_RATE,
    DEFAULT_LOWPASS_HZ, DEFAULT_NEXT_LABELS, DEFAULT_OUTPUT_RATE, DEFAULT_PREV_LABELS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_REFRACTORY_MS, DEFAULT_RUN_LENGTH, DEFAULT_SILENCE_LABEL,
    DEFAULT_SILENCE_THRESHOLD, DEFAULT_STARVATION_MS, DEFAULT_WATCHDOG_MS, DEFAULT_WINDOW_MS,
};
use defaults::{default_next_labels, default_prev_labels};

/// CLI options for the live page turner. Validated values keep the pipeline
/// inside the ranges the DSP and packet framing were designed for.
#[derive(Debug, Parser, Clone)]
#[command(about = "Pageturner voice command pipeline", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// YAML deployment profile; replaces every pipeline flag below when given
    #[arg(long, env = "PAGETURNER_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Start with continuous classification enabled
    #[arg(long, default_value_t = false)]
    pub production: bool,

    /// Classifier program (an interpreter name or an executable path)
    #[arg(long = "classifier-cmd", env = "PAGETURNER_CLASSIFIER")]
    pub classifier_cmd: Option<String>,

    /// Extra arguments for the classifier program (repeatable)
    #[arg(long = "classifier-arg", action = ArgAction::Append, value_name = "ARG")]
    pub classifier_args: Vec<String>,

    /// Classifier label names in score order (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// File receiving framed host packets (defaults to discarding them)
    #[arg(long = "host-output")]
    pub host_output: Option<PathBuf>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "PAGETURNER_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "PAGETURNER_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable per-window timing logs
    #[arg(long)]
    pub log_timings: bool,

    /// Input sample rate (Hz); the live runner uses the device rate instead
    #[arg(long = "input-rate", default_value_t = DEFAULT_INPUT_RATE)]
    pub input_rate: u32,

    /// Classifier sample rate (Hz)
    #[arg(long = "output-rate", default_value_t = DEFAULT_OUTPUT_RATE)]
    pub output_rate: u32,

    /// Analysis window length (milliseconds)
    #[arg(long = "window-ms", default_value_t = DEFAULT_WINDOW_MS)]
    pub window_ms: u64,

    /// Samples per acquisition block
    #[arg(long = "block-samples", default_value_t = DEFAULT_BLOCK_SAMPLES)]
    pub block_samples: usize,

    /// Blocks buffered between the audio callback and the main loop
    #[arg(long = "queue-capacity", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Filter cascade applied at the input rate
    #[arg(long = "filter-profile", value_enum, default_value_t = default_filter_profile())]
    pub filter_profile: FilterProfile,

    /// Lower band edge (Hz)
    #[arg(long = "highpass-hz", default_value_t = DEFAULT_HIGHPASS_HZ)]
    pub highpass_hz: f32,

    /// Upper band edge (Hz)
    #[arg(long = "lowpass-hz", default_value_t = DEFAULT_LOWPASS_HZ)]
    pub lowpass_hz: f32,

    /// Quality factor of every section
    #[arg(long = "filter-q", default_value_t = DEFAULT_FILTER_Q)]
    pub filter_q: f32,

    /// Resampling algorithm
    #[arg(long, value_enum, default_value_t = default_resampler())]
    pub resampler: ResampleMethod,

    /// RMS below which a window counts as silence (normalized full scale)
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: f32,

    /// Identical classifications in a row required before a command fires
    #[arg(long = "run-length", default_value_t = DEFAULT_RUN_LENGTH)]
    pub run_length: u32,

    /// Minimum time between two emitted commands (milliseconds)
    #[arg(long = "refractory-ms", default_value_t = DEFAULT_REFRACTORY_MS)]
    pub refractory_ms: u64,

    /// Minimum spacing between continuous classifications (milliseconds)
    #[arg(long = "inference-interval-ms", default_value_t = DEFAULT_INFERENCE_INTERVAL_MS)]
    pub inference_interval_ms: u64,

    /// Button debounce stability window (milliseconds)
    #[arg(long = "debounce-ms", default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Tap/hold disambiguation window (milliseconds)
    #[arg(long = "hold-ms", default_value_t = DEFAULT_HOLD_MS)]
    pub hold_ms: u64,

    /// Main-loop liveness deadline (milliseconds)
    #[arg(long = "watchdog-ms", default_value_t = DEFAULT_WATCHDOG_MS)]
    pub watchdog_ms: u64,

    /// Report missing audio after this long (milliseconds)
    #[arg(long = "starvation-ms", default_value_t = DEFAULT_STARVATION_MS)]
    pub starvation_ms: u64,

    /// Label that turns to the next page (repeatable; defaults to weiter,next)
    #[arg(long = "next-label", action = ArgAction::Append)]
    pub next_labels: Vec<String>,

    /// Label that turns to the previous page (repeatable; defaults to zurück,back)
    #[arg(long = "prev-label", action = ArgAction::Append)]
    pub prev_labels: Vec<String>,

    /// Label the classifier uses for silence
    #[arg(long = "silence-label", default_value = DEFAULT_SILENCE_LABEL)]
    pub silence_label: String,

    /// Profile loaded during validation.
    #[arg(skip)]
    pub(crate) loaded_profile: Option<PipelineConfig>,
}

/// Command bytes written into the packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketCommands {
    pub audio_window: u8,
    pub scores: u8,
    pub stream: u8,
}

impl Default for PacketCommands {
    fn default() -> Self {
        Self {
            audio_window: DEFAULT_CMD_AUDIO_WINDOW,
            scores: DEFAULT_CMD_SCORES,
            stream: DEFAULT_CMD_STREAM,
        }
    }
}

/// Classifier label names with a special meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub silence: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            next: default_next_labels(),
            prev: default_prev_labels(),
            silence: DEFAULT_SILENCE_LABEL.to_string(),
        }
    }
}

/// Tunable parameters for one pipeline instance. Everything is fixed for the
/// lifetime of the instance; a restart rebuilds the pipeline from this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_rate: u32,
    pub output_rate: u32,
    pub window_ms: u64,
    pub block_samples: usize,
    pub queue_capacity: usize,
    pub filter_profile: FilterProfile,
    pub highpass_hz: f32,
    pub lowpass_hz: f32,
    pub filter_q: f32,
    pub resampler: ResampleMethod,
    pub silence_threshold: f32,
    pub required_run_length: u32,
    pub refractory_ms: u64,
    pub inference_interval_ms: u64,
    pub debounce_ms: u64,
    pub hold_ms: u64,
    pub watchdog_timeout_ms: u64,
    pub starvation_ms: u64,
    pub commands: PacketCommands,
    pub labels: LabelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_rate: DEFAULT_INPUT_RATE,
            output_rate: DEFAULT_OUTPUT_RATE,
            window_ms: DEFAULT_WINDOW_MS,
            block_samples: DEFAULT_BLOCK_SAMPLES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            filter_profile: default_filter_profile(),
            highpass_hz: DEFAULT_HIGHPASS_HZ,
            lowpass_hz: DEFAULT_LOWPASS_HZ,
            filter_q: DEFAULT_FILTER_Q,
            resampler: default_resampler(),
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            required_run_length: DEFAULT_RUN_LENGTH,
            refractory_ms: DEFAULT_REFRACTORY_MS,
            inference_interval_ms: DEFAULT_INFERENCE_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            hold_ms: DEFAULT_HOLD_MS,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_MS,
            starvation_ms: DEFAULT_STARVATION_MS,
            commands: PacketCommands::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Input samples in one analysis window.
    pub fn raw_samples(&self) -> usize {
        (u64::from(self.input_rate) * self.window_ms / 1000) as usize
    }

    /// Classifier samples in one analysis window.
    pub fn window_samples(&self) -> usize {
        (u64::from(self.output_rate) * self.window_ms / 1000) as usize
    }

    /// Milliseconds of audio the block queue can hold.
    pub fn queue_depth_ms(&self) -> u64 {
        if self.input_rate == 0 {
            return 0;
        }
        (self.queue_capacity as u64 * self.block_samples as u64 * 1000) / u64::from(self.input_rate)
    }
}
