//! Framed packet protocol used to ship audio windows and scores to a host.
//!
//! Every frame on the wire is
//!
//! ```text
//! AB CD <cmd> <len_hi> <len_lo> <chunk_index> <total_chunks> <data...> <crc8>
//! ```
//!
//! where `len` counts the two chunk bytes plus the data. Messages larger than
//! [`MAX_CHUNK_DATA`] are split across frames sharing `cmd` and `total_chunks`.
//! Delivery is fire-and-forget: nothing is acknowledged or retried.

mod decode;
mod frame;
mod messages;
#[cfg(test)]
mod tests;

pub use decode::{Frame, FrameDecoder, Message, Reassembler};
pub use frame::{crc32, crc8, encode_frames, PacketWriter};
pub use messages::{audio_to_bytes, bytes_to_audio, ScoreReport};

/// Sync bytes opening every frame.
pub const MAGIC: [u8; 2] = [0xAB, 0xCD];

/// Largest data slice carried by one frame.
pub const MAX_CHUNK_DATA: usize = 512;

/// `chunk_index` and `total_chunks` are single bytes.
pub const MAX_CHUNKS: usize = u8::MAX as usize;

/// Bytes in the chunk sub-header counted by `len`.
pub const CHUNK_HEADER_LEN: usize = 2;

/// Header bytes before the payload: magic, cmd, len.
pub const FRAME_HEADER_LEN: usize = 5;
