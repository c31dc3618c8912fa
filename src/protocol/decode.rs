use super::{crc8, CHUNK_HEADER_LEN, FRAME_HEADER_LEN, MAGIC, MAX_CHUNK_DATA};
use crate::log_debug;
use std::collections::{HashMap, VecDeque};

/// One validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub cmd: u8,
    pub chunk_index: u8,
    pub total_chunks: u8,
    pub data: Vec<u8>,
}

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub cmd: u8,
    pub payload: Vec<u8>,
}

/// Incremental frame parser. Bytes can be fed in arbitrary slices; on a bad
/// header or checksum the decoder skips one byte and hunts for the next magic.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: VecDeque<u8>,
    crc_errors: u64,
    skipped_bytes: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }

    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Buffer `bytes` and return every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Return the next complete frame, or `None` when more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.seek_magic();
            if self.buffer.len() < FRAME_HEADER_LEN {
                return None;
            }

            let cmd = self.buffer[2];
            let len = u16::from_be_bytes([self.buffer[3], self.buffer[4]]);
            let len_usize = usize::from(len);
            if !(CHUNK_HEADER_LEN..=CHUNK_HEADER_LEN + MAX_CHUNK_DATA).contains(&len_usize) {
                log_debug(&format!("protocol: implausible frame length {len}, resyncing"));
                self.skip(1);
                continue;
            }

            let frame_len = FRAME_HEADER_LEN + len_usize + 1;
            if self.buffer.len() < frame_len {
                return None;
            }

            let body: Vec<u8> = self
                .buffer
                .range(FRAME_HEADER_LEN..FRAME_HEADER_LEN + len_usize)
                .copied()
                .collect();
            let crc = self.buffer[frame_len - 1];
            if crc8(cmd, len, &body) != crc {
                self.crc_errors += 1;
                log_debug(&format!("protocol: crc mismatch on cmd 0x{cmd:02X}, resyncing"));
                self.skip(1);
                continue;
            }

            self.buffer.drain(..frame_len);
            return Some(Frame {
                cmd,
                chunk_index: body[0],
                total_chunks: body[1],
                data: body[CHUNK_HEADER_LEN..].to_vec(),
            });
        }
    }

    fn seek_magic(&mut self) {
        while !self.buffer.is_empty() {
            if self.buffer[0] == MAGIC[0] {
                match self.buffer.get(1) {
                    Some(&b) if b == MAGIC[1] => return,
                    None => return,
                    Some(_) => {}
                }
            }
            self.skip(1);
        }
    }

    fn skip(&mut self, count: usize) {
        let count = count.min(self.buffer.len());
        self.buffer.drain(..count);
        self.skipped_bytes += count as u64;
    }
}

/// Joins chunked frames back into messages, one partial message per command.
/// A chunk that does not continue its command's message discards it.
#[derive(Debug, Default)]
pub struct Reassembler {
    partial: HashMap<u8, Partial>,
    dropped: u64,
}

#[derive(Debug)]
struct Partial {
    total: u8,
    next_index: u8,
    payload: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages abandoned because a chunk went missing or arrived out of order.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, frame: Frame) -> Option<Message> {
        if frame.total_chunks == 0 || frame.chunk_index >= frame.total_chunks {
            self.dropped += 1;
            return None;
        }

        if frame.chunk_index == 0 {
            let fresh = Partial {
                total: frame.total_chunks,
                next_index: 0,
                payload: Vec::with_capacity(usize::from(frame.total_chunks) * MAX_CHUNK_DATA),
            };
            if self.partial.insert(frame.cmd, fresh).is_some() {
                self.dropped += 1;
            }
        }

        let continues = matches!(
            self.partial.get(&frame.cmd),
            Some(partial)
                if partial.total == frame.total_chunks && partial.next_index == frame.chunk_index
        );
        if !continues {
            if self.partial.remove(&frame.cmd).is_some() {
                self.dropped += 1;
            }
            return None;
        }

        let partial = self.partial.get_mut(&frame.cmd)?;
        partial.payload.extend_from_slice(&frame.data);
        partial.next_index += 1;
        if partial.next_index < partial.total {
            return None;
        }
        self.partial.remove(&frame.cmd).map(|partial| Message {
            cmd: frame.cmd,
            payload: partial.payload,
        })
    }
}
