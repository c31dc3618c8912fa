//! System microphone capture via CPAL.
//!
//! Stands in for the firmware's I2S record queue: the device callback converts
//! whatever format the hardware delivers to mono i16 blocks and pushes them
//! into the block queue that the main loop drains.

use super::dispatch::BlockProducer;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex};

/// Audio input device wrapper.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Native sample rate of the device's default input configuration.
    pub fn sample_rate(&self) -> Result<u32> {
        let config = self
            .device
            .default_input_config()
            .context("failed to query default input config")?;
        Ok(config.sample_rate().0)
    }

    /// Start streaming into `producer`. Audio flows until the returned stream is dropped.
    pub fn start(&self, producer: BlockProducer) -> Result<cpal::Stream> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let channels = usize::from(device_config.channels.max(1));

        log_debug(&format!(
            "Recorder config: format={format:?} sample_rate={}Hz channels={channels}",
            device_config.sample_rate.0
        ));

        let producer = Arc::new(Mutex::new(producer));
        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        // The callback must never block; a contended lock simply skips the chunk.
        let stream = match format {
            SampleFormat::F32 => {
                let producer = Arc::clone(&producer);
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = producer.try_lock() {
                            pump.push_samples(data, channels, |sample| sample);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let producer = Arc::clone(&producer);
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = producer.try_lock() {
                            pump.push_samples(data, channels, |sample| sample as f32 / 32_768.0);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let producer = Arc::clone(&producer);
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = producer.try_lock() {
                            pump.push_samples(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play().context("failed to start input stream")?;
        Ok(stream)
    }
}
