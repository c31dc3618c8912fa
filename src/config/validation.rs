use super::defaults::{MAX_CLASSIFIER_ARGS, MAX_LABELS, MAX_WINDOW_MS};
use super::{AppConfig, LabelConfig, PipelineConfig};
use crate::audio::{FilterChain, MAX_DEVICE_RATE, MIN_DEVICE_RATE};
use crate::protocol::{MAX_CHUNKS, MAX_CHUNK_DATA};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::{fs, path::Path};

impl AppConfig {
    /// Check CLI values, load the profile if one was given and validate the
    /// resulting pipeline configuration.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(cmd) = &self.classifier_cmd {
            self.classifier_cmd = Some(sanitize_binary(
                cmd,
                "--classifier-cmd",
                &["python3", "python"],
            )?);
        }
        if self.classifier_args.len() > MAX_CLASSIFIER_ARGS {
            bail!(
                "--classifier-arg repeated too many times (max {MAX_CLASSIFIER_ARGS}, got {})",
                self.classifier_args.len()
            );
        }

        if self.classifier_cmd.is_some() && self.labels.is_empty() {
            bail!("--labels is required when --classifier-cmd is set");
        }
        validate_label_names(&self.labels)?;

        if let Some(path) = &self.host_output {
            if path.is_dir() {
                bail!("--host-output '{}' is a directory", path.display());
            }
        }

        self.loaded_profile = match &self.profile {
            Some(path) => Some(load_profile(path)?),
            None => None,
        };

        self.pipeline_config().validate()
    }

    /// Snapshot the pipeline settings: the loaded profile when present,
    /// otherwise the individual flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        if let Some(profile) = &self.loaded_profile {
            return profile.clone();
        }
        let defaults = LabelConfig::default();
        PipelineConfig {
            input_rate: self.input_rate,
            output_rate: self.output_rate,
            window_ms: self.window_ms,
            block_samples: self.block_samples,
            queue_capacity: self.queue_capacity,
            filter_profile: self.filter_profile,
            highpass_hz: self.highpass_hz,
            lowpass_hz: self.lowpass_hz,
            filter_q: self.filter_q,
            resampler: self.resampler,
            silence_threshold: self.silence_threshold,
            required_run_length: self.run_length,
            refractory_ms: self.refractory_ms,
            inference_interval_ms: self.inference_interval_ms,
            debounce_ms: self.debounce_ms,
            hold_ms: self.hold_ms,
            watchdog_timeout_ms: self.watchdog_ms,
            starvation_ms: self.starvation_ms,
            commands: Default::default(),
            labels: LabelConfig {
                next: non_empty_or(&self.next_labels, defaults.next),
                prev: non_empty_or(&self.prev_labels, defaults.prev),
                silence: self.silence_label.clone(),
            },
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML profile outside the CLI (host tools).
    pub fn from_profile(path: &Path) -> Result<Self> {
        let cfg = load_profile(path)?;
        cfg.validate()
            .with_context(|| format!("invalid profile '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Range checks shared by CLI flags and YAML profiles.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&self.input_rate) {
            bail!(
                "input rate must be between {MIN_DEVICE_RATE} and {MAX_DEVICE_RATE} Hz, got {}",
                self.input_rate
            );
        }
        if !(8_000..=48_000).contains(&self.output_rate) {
            bail!(
                "output rate must be between 8000 and 48000 Hz, got {}",
                self.output_rate
            );
        }
        if !(100..=MAX_WINDOW_MS).contains(&self.window_ms) {
            bail!(
                "window must be between 100 and {MAX_WINDOW_MS} ms, got {}",
                self.window_ms
            );
        }
        // The audio window must fit the chunk counter of a single message.
        let window_bytes = self.window_samples() * 2;
        if window_bytes > MAX_CHUNKS * MAX_CHUNK_DATA {
            bail!(
                "analysis window of {window_bytes} bytes exceeds the {} byte packet limit",
                MAX_CHUNKS * MAX_CHUNK_DATA
            );
        }
        if !(16..=4_096).contains(&self.block_samples) {
            bail!(
                "block size must be between 16 and 4096 samples, got {}",
                self.block_samples
            );
        }
        if !(8..=8_192).contains(&self.queue_capacity) {
            bail!(
                "queue capacity must be between 8 and 8192 blocks, got {}",
                self.queue_capacity
            );
        }

        let nyquist = self.input_rate as f32 / 2.0;
        if !(self.highpass_hz > 0.0 && self.highpass_hz < self.lowpass_hz) {
            bail!(
                "high-pass edge ({} Hz) must be positive and below the low-pass edge ({} Hz)",
                self.highpass_hz,
                self.lowpass_hz
            );
        }
        if self.lowpass_hz >= nyquist {
            bail!(
                "low-pass edge ({} Hz) must be below the input Nyquist frequency ({nyquist} Hz)",
                self.lowpass_hz
            );
        }
        if !(0.1..=20.0).contains(&self.filter_q) {
            bail!("filter Q must be between 0.1 and 20.0, got {}", self.filter_q);
        }
        let chain = FilterChain::from_config(self);
        if let Some(section) = chain
            .sections()
            .iter()
            .find(|section| !section.coefficients().is_stable())
        {
            bail!(
                "{} section is unstable for band {}-{} Hz at {} Hz (Q {}); raise the band edges",
                section.kind().label(),
                self.highpass_hz,
                self.lowpass_hz,
                self.input_rate,
                self.filter_q
            );
        }

        if !(self.silence_threshold > 0.0 && self.silence_threshold < 1.0) {
            bail!(
                "silence threshold must be in (0, 1), got {}",
                self.silence_threshold
            );
        }
        if !(1..=50).contains(&self.required_run_length) {
            bail!(
                "run length must be between 1 and 50, got {}",
                self.required_run_length
            );
        }
        if self.refractory_ms > 60_000 {
            bail!(
                "refractory period must be at most 60000 ms, got {}",
                self.refractory_ms
            );
        }
        if !(1..=10_000).contains(&self.inference_interval_ms) {
            bail!(
                "inference interval must be between 1 and 10000 ms, got {}",
                self.inference_interval_ms
            );
        }
        if !(1..=500).contains(&self.debounce_ms) {
            bail!(
                "debounce must be between 1 and 500 ms, got {}",
                self.debounce_ms
            );
        }
        if self.hold_ms <= self.debounce_ms || self.hold_ms > 5_000 {
            bail!(
                "hold window must exceed the debounce window ({} ms) and be at most 5000 ms, got {}",
                self.debounce_ms,
                self.hold_ms
            );
        }
        if !(100..=60_000).contains(&self.watchdog_timeout_ms) {
            bail!(
                "watchdog timeout must be between 100 and 60000 ms, got {}",
                self.watchdog_timeout_ms
            );
        }
        if self.starvation_ms == 0 {
            bail!("starvation timeout must be positive");
        }

        let commands = [
            self.commands.audio_window,
            self.commands.scores,
            self.commands.stream,
        ];
        let unique: HashSet<u8> = commands.iter().copied().collect();
        if unique.len() != commands.len() {
            bail!("packet command codes must be distinct, got {commands:02X?}");
        }

        if self.labels.next.is_empty() || self.labels.prev.is_empty() {
            bail!("at least one next and one previous label are required");
        }
        let overlap = self
            .labels
            .next
            .iter()
            .find(|name| self.labels.prev.iter().any(|p| p.eq_ignore_ascii_case(name)));
        if let Some(name) = overlap {
            bail!("label '{name}' cannot mean both next and previous page");
        }
        Ok(())
    }
}

/// Read a YAML deployment profile; missing keys keep their defaults.
pub(super) fn load_profile(path: &Path) -> Result<PipelineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile '{}'", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse profile '{}'", path.display()))
}

pub(super) fn validate_label_names(labels: &[String]) -> Result<()> {
    if labels.len() > MAX_LABELS {
        bail!("--labels accepts at most {MAX_LABELS} names, got {}", labels.len());
    }
    let mut seen = HashSet::new();
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            bail!("--labels must not contain empty names");
        }
        if !seen.insert(trimmed.to_lowercase()) {
            bail!("--labels contains '{trimmed}' more than once");
        }
    }
    Ok(())
}

fn non_empty_or(values: &[String], fallback: Vec<String>) -> Vec<String> {
    if values.is_empty() {
        fallback
    } else {
        values.to_vec()
    }
}

/// Allow either a known binary name or an executable path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must be one of {allowlist:?} or an existing executable path");
}
