//! The cooperative main loop: one `tick` drains audio, conditions it and
//! drives classification, voting and capture shipping.
//!
//! ```text
//! block queue -> FilterChain (input rate) -> AcquisitionBuffer
//!     -> Resampler (window) -> EnergyGate -> Classifier -> CommandVoter -> sink
//! ```
//!
//! Blocks are filtered once, in arrival order, as they are drained, so the
//! filter state runs continuously across windows. The window is resampled on
//! demand whenever a classification or a capture needs it.

mod watchdog;

pub use watchdog::Watchdog;

use crate::audio::{
    rms, rms_db, AcquisitionBuffer, BlockSource, EnergyGate, FilterChain, Resampler,
};
use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::log_debug;
use crate::mode::{ButtonInput, DebouncedButton, Mode, ModeController, Transition};
use crate::protocol::{audio_to_bytes, ScoreReport};
use crate::sink::{CommandSink, HostLink};
use crate::vote::{Candidate, CommandVoter, LabelMap, PageCommand, VoteState};
use anyhow::Result;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Collaborators borrowed for one tick.
pub struct PipelineIo<'a> {
    pub source: &'a mut dyn BlockSource,
    pub button: &'a mut dyn ButtonInput,
    pub classifier: &'a mut dyn Classifier,
    pub sink: &'a mut dyn CommandSink,
    pub host: &'a mut dyn HostLink,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub blocks: usize,
    pub samples: usize,
    pub transitions: Vec<Transition>,
    /// A production window was evaluated (gated or classified).
    pub evaluated: bool,
    pub gated: bool,
    pub command: Option<PageCommand>,
    pub window_shipped: bool,
    /// Set on the tick that first reports missing audio.
    pub starved: bool,
}

/// Running totals for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub ticks: u64,
    pub blocks: u64,
    pub evaluated_windows: u64,
    pub gated_windows: u64,
    pub classifier_errors: u64,
    pub commands: u64,
    pub shipped_windows: u64,
    pub host_errors: u64,
}

/// Result of running one window through the conditioning chain offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineWindow {
    pub input_samples: usize,
    pub window: Vec<i16>,
    pub rms: f32,
    pub rms_db: f32,
    pub silent: bool,
}

/// All per-instance pipeline state. Nothing is shared between instances, so a
/// restart is simply a new context built from the same configuration.
pub struct PipelineContext {
    cfg: PipelineConfig,
    labels: LabelMap,
    filter: FilterChain,
    resampler: Resampler,
    gate: EnergyGate,
    voter: CommandVoter,
    modes: ModeController,
    button: DebouncedButton,
    acquisition: AcquisitionBuffer,
    watchdog: Watchdog,
    filtered: Vec<i16>,
    raw_window: Vec<i16>,
    window: Vec<i16>,
    last_inference_ms: Option<u64>,
    fresh_audio: bool,
    last_audio_ms: Option<u64>,
    starvation_reported: bool,
    log_timings: bool,
    stats: PipelineStats,
}

impl PipelineContext {
    pub fn new(cfg: &PipelineConfig, labels: LabelMap) -> Self {
        let raw_samples = cfg.raw_samples();
        let window_samples = cfg.window_samples();
        Self {
            cfg: cfg.clone(),
            labels,
            filter: FilterChain::from_config(cfg),
            resampler: Resampler::new(
                cfg.resampler,
                cfg.input_rate,
                cfg.output_rate,
                window_samples,
            ),
            gate: EnergyGate::new(cfg.silence_threshold),
            voter: CommandVoter::new(cfg.required_run_length, cfg.refractory_ms),
            modes: ModeController::new(false, raw_samples, cfg.hold_ms),
            button: DebouncedButton::new(cfg.debounce_ms),
            acquisition: AcquisitionBuffer::new(raw_samples),
            watchdog: Watchdog::new(cfg.watchdog_timeout_ms),
            filtered: Vec::with_capacity(cfg.block_samples),
            raw_window: Vec::with_capacity(raw_samples),
            window: Vec::with_capacity(window_samples),
            last_inference_ms: None,
            fresh_audio: false,
            last_audio_ms: None,
            starvation_reported: false,
            log_timings: false,
            stats: PipelineStats::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn vote_state(&self) -> VoteState {
        self.voter.state()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn set_log_timings(&mut self, enabled: bool) {
        self.log_timings = enabled;
    }

    pub fn set_production(&mut self, enabled: bool) -> Option<Transition> {
        self.modes.set_production(enabled)
    }

    pub fn toggle_production(&mut self) -> Option<Transition> {
        self.modes.toggle_production()
    }

    /// One main-loop iteration. Only a missed watchdog deadline is an error;
    /// classifier and host link failures are logged and absorbed.
    pub fn tick(&mut self, io: PipelineIo<'_>, now_ms: u64) -> Result<TickReport> {
        self.watchdog.check(now_ms)?;
        self.watchdog.feed(now_ms);
        self.stats.ticks += 1;

        let PipelineIo {
            source,
            button,
            classifier,
            sink,
            host,
        } = io;
        let mut report = TickReport::default();
        self.update_button(button, source, now_ms, &mut report);
        let window_ready = self.drain(source, now_ms, &mut report);

        match self.modes.mode() {
            Mode::Production => self.run_inference(classifier, sink, now_ms, &mut report),
            Mode::Recording | Mode::Streaming if window_ready => {
                self.ship_capture(classifier, host, &mut report);
                let held = self.button.is_pressed();
                if let Some(transition) = self.modes.finish_window(held) {
                    self.apply_transition(transition, source, &mut report);
                }
            }
            _ => {}
        }
        Ok(report)
    }

    fn update_button(
        &mut self,
        input: &mut dyn ButtonInput,
        source: &mut dyn BlockSource,
        now_ms: u64,
        report: &mut TickReport,
    ) {
        let raw = input.is_pressed();
        if let Some(edge) = self.button.update(raw, now_ms) {
            debug!(?edge, now_ms, "button edge");
            if let Some(transition) = self.modes.on_button(edge, now_ms) {
                self.apply_transition(transition, source, report);
            }
        }
        if let Some(transition) = self.modes.poll(now_ms, self.button.is_pressed()) {
            self.apply_transition(transition, source, report);
        }
    }

    fn apply_transition(
        &mut self,
        transition: Transition,
        source: &mut dyn BlockSource,
        report: &mut TickReport,
    ) {
        if transition.enters_capture() {
            source.clear();
        }
        report.transitions.push(transition);
    }

    /// Filter and buffer every queued block. Returns true once a capture
    /// window has been filled.
    fn drain(
        &mut self,
        source: &mut dyn BlockSource,
        now_ms: u64,
        report: &mut TickReport,
    ) -> bool {
        let mut window_ready = false;
        while let Some(block) = source.read_block() {
            self.filtered.clear();
            self.filter.process_block(&block, &mut self.filtered);
            self.acquisition.push(&self.filtered);
            report.blocks += 1;
            report.samples += block.len();
            window_ready |= self.modes.record_samples(block.len());
        }
        self.stats.blocks += report.blocks as u64;

        if report.blocks > 0 {
            self.fresh_audio = true;
            self.last_audio_ms = Some(now_ms);
            self.starvation_reported = false;
            return window_ready;
        }

        let last = *self.last_audio_ms.get_or_insert(now_ms);
        let silent_for = now_ms.saturating_sub(last);
        if silent_for > self.cfg.starvation_ms && !self.starvation_reported {
            warn!(silent_for_ms = silent_for, "no audio blocks received");
            self.starvation_reported = true;
            report.starved = true;
        }
        window_ready
    }

    fn prepare_window(&mut self) {
        self.acquisition.copy_window(&mut self.raw_window);
        self.resampler.process_into(&self.raw_window, &mut self.window);
    }

    fn run_inference(
        &mut self,
        classifier: &mut dyn Classifier,
        sink: &mut dyn CommandSink,
        now_ms: u64,
        report: &mut TickReport,
    ) {
        if !self.fresh_audio {
            return;
        }
        if let Some(last) = self.last_inference_ms {
            if now_ms.saturating_sub(last) < self.cfg.inference_interval_ms {
                return;
            }
        }
        self.last_inference_ms = Some(now_ms);
        self.fresh_audio = false;

        let started = Instant::now();
        self.prepare_window();
        report.evaluated = true;
        self.stats.evaluated_windows += 1;

        let candidate = if self.gate.is_silence(&self.window) {
            report.gated = true;
            self.stats.gated_windows += 1;
            Candidate::Silence
        } else {
            match classifier.classify(&self.window) {
                Ok(result) => match result.best() {
                    Some((index, confidence)) => Candidate::Label { index, confidence },
                    None => {
                        debug!("classifier returned no usable scores; vote skipped");
                        return;
                    }
                },
                Err(err) => {
                    self.stats.classifier_errors += 1;
                    warn!(error = %err, "classification failed; vote skipped");
                    return;
                }
            }
        };

        if let Some(command) = self.voter.observe(candidate, &self.labels, now_ms) {
            self.stats.commands += 1;
            sink.emit(command);
            report.command = Some(command);
        }
        if self.log_timings {
            let label = match candidate {
                Candidate::Silence => "silence",
                Candidate::Label { index, .. } => self.labels.name(index).unwrap_or("?"),
            };
            log_debug(&format!(
                "timing|phase=inference|label={label}|run={}|elapsed_ms={:.2}",
                self.voter.state().run_length,
                started.elapsed().as_secs_f64() * 1000.0
            ));
        }
    }

    fn ship_capture(
        &mut self,
        classifier: &mut dyn Classifier,
        host: &mut dyn HostLink,
        report: &mut TickReport,
    ) {
        self.prepare_window();
        let scores = match classifier.classify(&self.window) {
            Ok(result) => result.scores,
            Err(err) => {
                self.stats.classifier_errors += 1;
                warn!(error = %err, "classification of captured window failed");
                Vec::new()
            }
        };
        let commands = self.cfg.commands;
        let score_cmd = if self.modes.mode() == Mode::Streaming {
            commands.stream
        } else {
            commands.scores
        };
        let scores = ScoreReport {
            sample_count: self.window.len() as u32,
            scores,
        };

        let sent = host
            .send(commands.audio_window, &audio_to_bytes(&self.window))
            .and_then(|_| host.send(score_cmd, &scores.encode()));
        match sent {
            Ok(()) => {
                self.stats.shipped_windows += 1;
                report.window_shipped = true;
                debug!(
                    samples = self.window.len(),
                    rms_db = rms_db(rms(&self.window)),
                    mode = self.modes.mode().label(),
                    "capture window shipped"
                );
            }
            Err(err) => {
                self.stats.host_errors += 1;
                warn!(error = %err, "failed to ship capture window");
            }
        }
    }
}

/// Condition a clip as one analysis window with a fresh filter chain. Only the
/// most recent `raw_samples` of `raw` make it into the window.
pub fn process_offline_window(cfg: &PipelineConfig, raw: &[i16]) -> OfflineWindow {
    let mut filter = FilterChain::from_config(cfg);
    let mut filtered = Vec::with_capacity(raw.len());
    filter.process_block(raw, &mut filtered);

    let mut acquisition = AcquisitionBuffer::new(cfg.raw_samples());
    acquisition.push(&filtered);
    let mut raw_window = Vec::new();
    acquisition.copy_window(&mut raw_window);

    let resampler = Resampler::new(
        cfg.resampler,
        cfg.input_rate,
        cfg.output_rate,
        cfg.window_samples(),
    );
    let window = resampler.process(&raw_window);
    let level = rms(&window);
    OfflineWindow {
        input_samples: raw.len(),
        silent: EnergyGate::new(cfg.silence_threshold).is_silence(&window),
        rms: level,
        rms_db: rms_db(level),
        window,
    }
}
