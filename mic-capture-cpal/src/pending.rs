use std::collections::VecDeque;

/// Captured samples waiting for the next pull.
///
/// Storage is reserved up front for `limit` samples. When a push overflows,
/// the oldest samples are dropped and counted.
#[derive(Debug)]
pub struct PendingAudio {
    samples: VecDeque<f32>,
    limit: usize,
    dropped: u64,
}

impl PendingAudio {
    pub fn new(limit: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(limit),
            limit,
            dropped: 0,
        }
    }

    pub fn push(&mut self, block: &[f32]) {
        let block = match block.len().checked_sub(self.limit) {
            Some(excess) if excess > 0 => {
                self.dropped += excess as u64;
                &block[excess..]
            }
            _ => block,
        };

        let overflow = (self.samples.len() + block.len()).saturating_sub(self.limit);
        if overflow > 0 {
            self.samples.drain(..overflow);
            self.dropped += overflow as u64;
        }
        self.samples.extend(block.iter().copied());
    }

    /// Move every queued sample, oldest first, to the end of `out`.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) {
        out.extend(self.samples.drain(..));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples currently queued.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
