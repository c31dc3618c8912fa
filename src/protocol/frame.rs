use super::{CHUNK_HEADER_LEN, FRAME_HEADER_LEN, MAGIC, MAX_CHUNKS, MAX_CHUNK_DATA};
use crate::sink::HostLink;
use anyhow::{bail, Context, Result};
use std::io::Write;

/// XOR fold over the command, both length bytes and the payload. This is not
/// a polynomial CRC; it only has to match what the host recomputes.
pub fn crc8(cmd: u8, len: u16, payload: &[u8]) -> u8 {
    let [len_hi, len_lo] = len.to_be_bytes();
    payload
        .iter()
        .fold(cmd ^ len_hi ^ len_lo, |crc, byte| crc ^ byte)
}

/// Standard reflected CRC-32 (polynomial 0xEDB88320) for whole-buffer checks.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// Split `payload` into wire frames. An empty payload still produces one frame
/// so the host sees the message.
pub fn encode_frames(cmd: u8, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    let total = payload.len().div_ceil(MAX_CHUNK_DATA).max(1);
    if total > MAX_CHUNKS {
        bail!(
            "payload of {} bytes needs {total} chunks; at most {MAX_CHUNKS} fit the chunk counter",
            payload.len()
        );
    }

    let mut frames = Vec::with_capacity(total);
    for index in 0..total {
        let start = index * MAX_CHUNK_DATA;
        let end = (start + MAX_CHUNK_DATA).min(payload.len());
        let data = &payload[start.min(end)..end];
        let len = (data.len() + CHUNK_HEADER_LEN) as u16;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + len as usize + 1);
        frame.extend_from_slice(&MAGIC);
        frame.push(cmd);
        frame.extend_from_slice(&len.to_be_bytes());
        let body_start = frame.len();
        frame.push(index as u8);
        frame.push(total as u8);
        frame.extend_from_slice(data);
        let crc = crc8(cmd, len, &frame[body_start..]);
        frame.push(crc);
        frames.push(frame);
    }
    Ok(frames)
}

/// Writes framed messages to any byte sink (serial port, file, stdout).
pub struct PacketWriter<W: Write> {
    inner: W,
    frames_sent: u64,
}

impl<W: Write> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frames_sent: 0,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Frame and write one message, flushing once all chunks are out.
    pub fn send(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        for frame in encode_frames(cmd, payload)? {
            self.inner
                .write_all(&frame)
                .with_context(|| format!("failed to write packet 0x{cmd:02X}"))?;
            self.frames_sent += 1;
        }
        self.inner.flush().context("failed to flush host link")
    }
}

impl<W: Write> HostLink for PacketWriter<W> {
    fn send(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        PacketWriter::send(self, cmd, payload)
    }
}
