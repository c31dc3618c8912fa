/// Sliding window over the most recent conditioned input samples.
///
/// The buffer starts zero-filled at full capacity, so a snapshot is always a
/// complete window; callers track how much of it is fresh.
#[derive(Debug, Clone)]
pub struct AcquisitionBuffer {
    samples: Vec<i16>,
    // Index of the oldest sample (next slot to overwrite).
    head: usize,
    filled: usize,
    total_pushed: u64,
}

impl AcquisitionBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0; capacity.max(1)],
            head: 0,
            filled: 0,
            total_pushed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Samples pushed since the last clear, up to capacity.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Append samples, dropping the oldest ones once the window is full.
    pub fn push(&mut self, block: &[i16]) {
        let cap = self.samples.len();
        self.total_pushed = self.total_pushed.saturating_add(block.len() as u64);
        // Only the newest `cap` samples of an oversized block can survive.
        let block = &block[block.len().saturating_sub(cap)..];
        let first = block.len().min(cap - self.head);
        self.samples[self.head..self.head + first].copy_from_slice(&block[..first]);
        let rest = &block[first..];
        self.samples[..rest.len()].copy_from_slice(rest);
        self.head = (self.head + block.len()) % cap;
        self.filled = (self.filled + block.len()).min(cap);
    }

    /// Copy the window, oldest sample first, replacing the contents of `out`.
    pub fn copy_window(&self, out: &mut Vec<i16>) {
        out.clear();
        out.extend_from_slice(&self.samples[self.head..]);
        out.extend_from_slice(&self.samples[..self.head]);
    }

    /// Discard everything; the partially filled window has no side effects.
    pub fn clear(&mut self) {
        self.samples.fill(0);
        self.head = 0;
        self.filled = 0;
    }
}
