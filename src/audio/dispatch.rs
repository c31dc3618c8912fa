//! Hand-off between the audio callback (producer) and the main loop (consumer).

use super::denormalize;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Non-blocking block source drained once per loop iteration.
pub trait BlockSource {
    /// Number of complete blocks waiting.
    fn available(&self) -> usize;
    /// Next block in arrival order, or `None` when the queue is empty.
    fn read_block(&mut self) -> Option<Vec<i16>>;
    /// Drop everything queued so a fresh capture starts from live audio.
    fn clear(&mut self);
}

/// Create a bounded block queue holding at most `capacity` blocks.
pub fn block_queue(capacity: usize, block_samples: usize) -> (BlockProducer, BlockQueue) {
    let (sender, receiver) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    let producer = BlockProducer::new(block_samples, sender, Arc::clone(&dropped));
    let queue = BlockQueue { receiver, dropped };
    (producer, queue)
}

/// Downmix multi-channel input to mono while applying the provided converter so
/// the pipeline sees a single channel regardless of the microphone layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Producer half: cuts the callback stream into fixed-size i16 blocks.
pub struct BlockProducer {
    block_samples: usize,
    pending: Vec<i16>,
    scratch: Vec<f32>,
    sender: Sender<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
}

impl BlockProducer {
    fn new(block_samples: usize, sender: Sender<Vec<i16>>, dropped: Arc<AtomicUsize>) -> Self {
        Self {
            block_samples: block_samples.max(1),
            pending: Vec::with_capacity(block_samples),
            scratch: Vec::new(),
            sender,
            dropped,
        }
    }

    /// Push interleaved samples from the device callback.
    pub fn push_samples<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, channels, convert);
        self.pending
            .extend(self.scratch.iter().map(|&sample| denormalize(sample)));
        self.flush_blocks();
    }

    /// Push mono PCM directly (synthetic sources and tests).
    pub fn push_pcm(&mut self, samples: &[i16]) {
        self.pending.extend_from_slice(samples);
        self.flush_blocks();
    }

    /// Blocks lost because the consumer fell behind.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn flush_blocks(&mut self) {
        while self.pending.len() >= self.block_samples {
            let block: Vec<i16> = self.pending.drain(..self.block_samples).collect();
            if let Err(err) = self.sender.try_send(block) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}

/// Consumer half owned by the main loop.
pub struct BlockQueue {
    receiver: Receiver<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
}

impl BlockQueue {
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl BlockSource for BlockQueue {
    fn available(&self) -> usize {
        self.receiver.len()
    }

    fn read_block(&mut self) -> Option<Vec<i16>> {
        match self.receiver.try_recv() {
            Ok(block) => Some(block),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn clear(&mut self) {
        while self.receiver.try_recv().is_ok() {}
    }
}
