//! Decode a captured host stream (file or stdin) and print one JSON line per
//! reassembled message.

use anyhow::{Context, Result};
use clap::Parser;
use pageturner::config::{PacketCommands, PipelineConfig};
use pageturner::protocol::{
    bytes_to_audio, crc32, FrameDecoder, Message, Reassembler, ScoreReport,
};
use serde_json::json;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Print the messages contained in a pageturner host stream")]
struct Args {
    /// Capture file written via --host-output; stdin when omitted
    input: Option<PathBuf>,

    /// Deployment profile whose packet command bytes label the stream
    #[arg(long, env = "PAGETURNER_PROFILE")]
    profile: Option<PathBuf>,
}

fn describe(message: &Message, commands: &PacketCommands) -> serde_json::Value {
    let mut line = json!({
        "cmd": format!("0x{:02X}", message.cmd),
        "bytes": message.payload.len(),
        "crc32": format!("{:08x}", crc32(&message.payload)),
    });
    if message.cmd == commands.audio_window {
        line["kind"] = json!("audio");
        match bytes_to_audio(&message.payload) {
            Ok(samples) => line["samples"] = json!(samples.len()),
            Err(err) => line["error"] = json!(err.to_string()),
        }
    } else if message.cmd == commands.scores || message.cmd == commands.stream {
        line["kind"] = json!(if message.cmd == commands.stream {
            "stream"
        } else {
            "scores"
        });
        match ScoreReport::decode(&message.payload) {
            Ok(report) => line["report"] = json!(report),
            Err(err) => line["error"] = json!(err.to_string()),
        }
    }
    line
}

fn main() -> Result<()> {
    let args = Args::parse();
    let commands = match &args.profile {
        Some(path) => PipelineConfig::from_profile(path)?.commands,
        None => PacketCommands::default(),
    };
    let mut reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let mut decoder = FrameDecoder::new();
    let mut reassembler = Reassembler::new();
    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; 4096];
    let mut messages = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for frame in decoder.push(&buf[..n]) {
            if let Some(message) = reassembler.push(frame) {
                messages += 1;
                writeln!(stdout, "{}", describe(&message, &commands))?;
            }
        }
    }

    eprintln!(
        "packet_sniffer|messages={messages}|crc_errors={}|skipped_bytes={}|dropped_messages={}",
        decoder.crc_errors(),
        decoder.skipped_bytes(),
        reassembler.dropped()
    );
    Ok(())
}
