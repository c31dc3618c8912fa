//! Where recognised commands and host packets go.

use crate::vote::PageCommand;
use anyhow::Result;
use std::io::{self, Write};
use tracing::info;

/// Receives page commands. Delivery (keyboard emulation, BLE) is up to the
/// implementation.
pub trait CommandSink {
    fn emit(&mut self, command: PageCommand);
}

/// Byte link to the host, fire-and-forget.
pub trait HostLink {
    fn send(&mut self, cmd: u8, payload: &[u8]) -> Result<()>;
}

/// Logs each command and prints it as one stdout line.
#[derive(Debug, Default)]
pub struct LogSink {
    emitted: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl CommandSink for LogSink {
    fn emit(&mut self, command: PageCommand) {
        self.emitted += 1;
        info!(command = command.label(), count = self.emitted, "page command");
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", command.label());
        let _ = stdout.flush();
    }
}

/// Host link that drops every packet; used when no output is configured.
#[derive(Debug, Default)]
pub struct DiscardLink;

impl HostLink for DiscardLink {
    fn send(&mut self, _cmd: u8, _payload: &[u8]) -> Result<()> {
        Ok(())
    }
}
