use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use pageturner::audio::{BlockQueue, BlockSource};
use pageturner::classifier::Classifier;
use pageturner::config::PipelineConfig;
use pageturner::log_debug;
use pageturner::mode::SharedButton;
use pageturner::pipeline::{PipelineContext, PipelineIo, PipelineStats};
use pageturner::sink::{HostLink, LogSink};
use pageturner::vote::LabelMap;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::input::InputEvent;

const TICK_INTERVAL: Duration = Duration::from_millis(5);

pub(crate) struct EventLoopDeps {
    pub(crate) config: PipelineConfig,
    pub(crate) labels: LabelMap,
    pub(crate) queue: BlockQueue,
    pub(crate) button: SharedButton,
    pub(crate) classifier: Box<dyn Classifier>,
    pub(crate) sink: LogSink,
    pub(crate) host: Box<dyn HostLink>,
    pub(crate) production: bool,
    pub(crate) log_timings: bool,
}

#[derive(Debug, Default)]
pub(crate) struct LoopSummary {
    pub(crate) stats: PipelineStats,
    pub(crate) restarts: u64,
}

fn fresh_context(deps: &EventLoopDeps) -> PipelineContext {
    let mut ctx = PipelineContext::new(&deps.config, deps.labels.clone());
    ctx.set_log_timings(deps.log_timings);
    ctx.set_production(deps.production);
    ctx
}

fn add_stats(total: &mut PipelineStats, part: PipelineStats) {
    total.ticks += part.ticks;
    total.blocks += part.blocks;
    total.evaluated_windows += part.evaluated_windows;
    total.gated_windows += part.gated_windows;
    total.classifier_errors += part.classifier_errors;
    total.commands += part.commands;
    total.shipped_windows += part.shipped_windows;
    total.host_errors += part.host_errors;
}

/// Apply one input event. Returns `false` when the loop should stop.
fn apply_event(event: InputEvent, deps: &mut EventLoopDeps, ctx: &mut PipelineContext) -> bool {
    match event {
        InputEvent::Press => deps.button.set(true),
        InputEvent::Release => deps.button.set(false),
        InputEvent::ToggleButton => {
            let pressed = deps.button.toggle();
            log_debug(&format!("button {}", if pressed { "down" } else { "up" }));
        }
        InputEvent::ToggleProduction => {
            deps.production = !deps.production;
            if ctx.set_production(deps.production).is_none() && ctx.mode().is_capturing() {
                eprintln!("Production switch applies after the current capture.");
            }
        }
        InputEvent::Exit => return false,
    }
    true
}

pub(crate) fn run_event_loop(
    mut deps: EventLoopDeps,
    input_rx: Receiver<InputEvent>,
) -> Result<LoopSummary> {
    let started = Instant::now();
    let mut ctx = fresh_context(&deps);
    let mut summary = LoopSummary::default();
    let mut input_open = true;

    loop {
        if input_open {
            match input_rx.recv_timeout(TICK_INTERVAL) {
                Ok(event) => {
                    if !apply_event(event, &mut deps, &mut ctx) {
                        break;
                    }
                    while let Ok(event) = input_rx.try_recv() {
                        if !apply_event(event, &mut deps, &mut ctx) {
                            add_stats(&mut summary.stats, ctx.stats());
                            return Ok(summary);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log_debug("stdin closed; button input disabled");
                    input_open = false;
                }
            }
        } else {
            std::thread::sleep(TICK_INTERVAL);
        }

        let now_ms = started.elapsed().as_millis() as u64;
        let io = PipelineIo {
            source: &mut deps.queue,
            button: &mut deps.button,
            classifier: deps.classifier.as_mut(),
            sink: &mut deps.sink,
            host: deps.host.as_mut(),
        };
        if let Err(err) = ctx.tick(io, now_ms) {
            warn!(error = %err, "pipeline restart");
            log_debug(&format!("pipeline restart: {err:#}"));
            add_stats(&mut summary.stats, ctx.stats());
            summary.restarts += 1;
            deps.queue.clear();
            ctx = fresh_context(&deps);
        }
    }

    add_stats(&mut summary.stats, ctx.stats());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate_across_restarts() {
        let mut total = PipelineStats::default();
        let part = PipelineStats {
            ticks: 3,
            commands: 1,
            host_errors: 2,
            ..PipelineStats::default()
        };
        add_stats(&mut total, part);
        add_stats(&mut total, part);
        assert_eq!(total.ticks, 6);
        assert_eq!(total.commands, 2);
        assert_eq!(total.host_errors, 4);
    }
}
