use std::f32::consts::PI;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use pageturner::audio::{FilterProfile, ResampleMethod};
use pageturner::config::{
    default_filter_profile, default_resampler, PipelineConfig, DEFAULT_HIGHPASS_HZ,
    DEFAULT_INPUT_RATE, DEFAULT_LOWPASS_HZ, DEFAULT_OUTPUT_RATE, DEFAULT_SILENCE_THRESHOLD,
    DEFAULT_WINDOW_MS,
};
use pageturner::pipeline::process_offline_window;

/// Synthetic benchmark harness for window conditioning.
#[derive(Debug, Parser)]
#[command(about = "Run synthetic clips through filter, resampler and energy gate")]
struct Args {
    /// Human-friendly label recorded in the output metrics
    #[arg(long, default_value = "clip")]
    label: String,

    /// Duration of the synthetic tone (milliseconds)
    #[arg(long, default_value_t = 600)]
    tone_ms: u64,

    /// Duration of trailing silence appended after the tone (milliseconds)
    #[arg(long, default_value_t = 400)]
    silence_ms: u64,

    /// Tone frequency (Hz)
    #[arg(long, default_value_t = 1_000.0)]
    tone_hz: f32,

    /// Tone peak as a fraction of full scale
    #[arg(long, default_value_t = 0.4)]
    amplitude: f32,

    #[arg(long = "input-rate", default_value_t = DEFAULT_INPUT_RATE)]
    input_rate: u32,

    #[arg(long = "output-rate", default_value_t = DEFAULT_OUTPUT_RATE)]
    output_rate: u32,

    #[arg(long = "window-ms", default_value_t = DEFAULT_WINDOW_MS)]
    window_ms: u64,

    #[arg(long = "filter-profile", value_enum, default_value_t = default_filter_profile())]
    filter_profile: FilterProfile,

    #[arg(long = "highpass-hz", default_value_t = DEFAULT_HIGHPASS_HZ)]
    highpass_hz: f32,

    #[arg(long = "lowpass-hz", default_value_t = DEFAULT_LOWPASS_HZ)]
    lowpass_hz: f32,

    #[arg(long, value_enum, default_value_t = default_resampler())]
    resampler: ResampleMethod,

    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    silence_threshold: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = build_pipeline_config(&args);
    cfg.validate()?;
    let clip = synthesize_clip(&args);

    let started = Instant::now();
    let result = process_offline_window(&cfg, &clip);
    let elapsed_us = started.elapsed().as_micros();

    println!(
        "pipeline_metrics|label={}|filter={}|resampler={}|input_samples={}|window_samples={}|rms_db={:.1}|silent={}|elapsed_us={elapsed_us}",
        args.label,
        cfg.filter_profile.label(),
        cfg.resampler.label(),
        result.input_samples,
        result.window.len(),
        result.rms_db,
        result.silent,
    );

    Ok(())
}

fn build_pipeline_config(args: &Args) -> PipelineConfig {
    PipelineConfig {
        input_rate: args.input_rate,
        output_rate: args.output_rate,
        window_ms: args.window_ms,
        filter_profile: args.filter_profile,
        highpass_hz: args.highpass_hz,
        lowpass_hz: args.lowpass_hz,
        resampler: args.resampler,
        silence_threshold: args.silence_threshold,
        ..PipelineConfig::default()
    }
}

fn synthesize_clip(args: &Args) -> Vec<i16> {
    let rate = args.input_rate as u64;
    let tone_samples = (args.tone_ms * rate / 1000) as usize;
    let silence_samples = (args.silence_ms * rate / 1000) as usize;
    let peak = args.amplitude.clamp(0.0, 1.0) * 32_767.0;
    let mut samples = Vec::with_capacity(tone_samples + silence_samples);
    for n in 0..tone_samples {
        let t = n as f32 / args.input_rate as f32;
        samples.push(((2.0 * PI * args.tone_hz * t).sin() * peak) as i16);
    }
    samples.extend(std::iter::repeat_n(0, silence_samples));
    samples
}
