//! Pageturner entrypoint: wires the microphone, the command classifier and the
//! host link into one pipeline and drives it from the main thread.
//!
//! # Architecture
//!
//! - Audio callback: cuts device audio into blocks for the bounded queue
//! - Input thread: reads stdin lines standing in for the hardware button
//! - Main loop: ticks the pipeline, restarts it when the watchdog fires

mod cli_utils;
mod event_loop;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use pageturner::audio::{block_queue, Recorder};
use pageturner::classifier::{Classifier, ExternalClassifier, NullClassifier};
use pageturner::config::AppConfig;
use pageturner::mode::SharedButton;
use pageturner::protocol::PacketWriter;
use pageturner::sink::{DiscardLink, HostLink, LogSink};
use pageturner::vote::LabelMap;
use pageturner::{init_logging, init_tracing, log_debug, log_file_path, log_panic};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::panic;
use std::sync::OnceLock;

use crate::cli_utils::{format_session_stats, list_input_devices};
use crate::event_loop::{run_event_loop, EventLoopDeps};
use crate::input::spawn_input_thread;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            log_panic(info);
            previous(info);
        }));
    });
}

fn build_classifier(config: &AppConfig) -> Result<Box<dyn Classifier>> {
    match &config.classifier_cmd {
        Some(program) => {
            let classifier =
                ExternalClassifier::spawn(program, &config.classifier_args, config.labels.clone())?;
            Ok(Box::new(classifier))
        }
        None => {
            eprintln!("No --classifier-cmd given; windows are captured but never recognised.");
            Ok(Box::new(NullClassifier::new()))
        }
    }
}

fn build_host_link(config: &AppConfig) -> Result<Box<dyn HostLink>> {
    match &config.host_output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open host output {}", path.display()))?;
            Ok(Box::new(PacketWriter::new(BufWriter::new(file))))
        }
        None => Ok(Box::new(DiscardLink)),
    }
}

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug("=== Pageturner Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let recorder = Recorder::new(config.input_device.as_deref())?;
    let mut pipeline_cfg = config.pipeline_config();
    let device_rate = recorder.sample_rate()?;
    if device_rate != pipeline_cfg.input_rate {
        log_debug(&format!(
            "Input rate {} Hz replaced by device rate {device_rate} Hz",
            pipeline_cfg.input_rate
        ));
        pipeline_cfg.input_rate = device_rate;
        pipeline_cfg
            .validate()
            .with_context(|| format!("device '{}' is unusable", recorder.device_name()))?;
    }

    let (producer, queue) = block_queue(pipeline_cfg.queue_capacity, pipeline_cfg.block_samples);
    // Audio stops when the stream is dropped.
    let _stream = recorder.start(producer)?;

    let classifier = build_classifier(&config)?;
    let labels = LabelMap::new(classifier.labels(), &pipeline_cfg.labels);
    let host = build_host_link(&config)?;

    let (input_tx, input_rx) = bounded(16);
    let _input_handle = spawn_input_thread(input_tx);

    eprintln!(
        "Listening on '{}' at {} Hz. Enter toggles the button, 'p' toggles production, 'q' quits.",
        recorder.device_name(),
        pipeline_cfg.input_rate
    );

    let deps = EventLoopDeps {
        config: pipeline_cfg,
        labels,
        queue,
        button: SharedButton::new(),
        classifier,
        sink: LogSink::new(),
        host,
        production: config.production,
        log_timings: config.log_timings,
    };
    let summary = run_event_loop(deps, input_rx)?;

    eprintln!("{}", format_session_stats(&summary.stats, summary.restarts));
    log_debug("=== Pageturner Exiting ===");
    Ok(())
}
