use crate::models::error::CaptureError;

/// Fixed-capacity sample container with a logical length.
///
/// Storage is allocated once and never grows. The first `count()` samples
/// are valid; anything past that is scratch space. Every mutating operation
/// either succeeds completely or leaves the buffer untouched.
///
/// Not internally synchronized. Sessions wrap it in
/// `parking_lot::Mutex<AudioBuffer>` for cross-thread delivery.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    buffer: Vec<f32>,
    count: usize,
}

impl AudioBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            count: 0,
        }
    }

    /// The total capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of valid samples at the front.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// The valid samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.buffer[..self.count]
    }

    /// The whole backing storage, for callers that write samples directly
    /// and then publish them with [`override_count`](Self::override_count).
    pub fn as_mut_storage(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Append one sample.
    pub fn try_add(&mut self, sample: f32) -> Result<(), CaptureError> {
        if self.count >= self.capacity() {
            return Err(self.overflow(self.count + 1));
        }
        self.buffer[self.count] = sample;
        self.count += 1;
        Ok(())
    }

    /// Replace the contents with `source[offset..offset + count]`.
    pub fn try_copy_from_slice(
        &mut self,
        source: &[f32],
        offset: usize,
        count: usize,
    ) -> Result<(), CaptureError> {
        if count > self.capacity() {
            return Err(self.overflow(count));
        }
        let src = source_range(source, offset, count)?;
        self.buffer[..count].copy_from_slice(src);
        self.count = count;
        Ok(())
    }

    /// Replace the contents with `count` samples read from `data`.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `count` consecutive `f32` values
    /// for the duration of the call, and must not alias this buffer.
    pub unsafe fn try_copy_from_raw(&mut self, data: *const f32, count: usize) -> Result<(), CaptureError> {
        if count > self.capacity() {
            return Err(self.overflow(count));
        }
        if count == 0 {
            self.count = 0;
            return Ok(());
        }
        if data.is_null() {
            return Err(CaptureError::InvalidSourceRange);
        }
        let src = std::slice::from_raw_parts(data, count);
        self.buffer[..count].copy_from_slice(src);
        self.count = count;
        Ok(())
    }

    /// Replace the contents with the valid samples of `other`.
    pub fn try_copy_from_buffer(&mut self, other: &AudioBuffer) -> Result<(), CaptureError> {
        self.try_copy_from_slice(other.as_slice(), 0, other.count())
    }

    /// Append `source[offset..offset + length]`.
    pub fn try_extend_from_slice(
        &mut self,
        source: &[f32],
        offset: usize,
        length: usize,
    ) -> Result<(), CaptureError> {
        let required = self.count + length;
        if required > self.capacity() {
            return Err(self.overflow(required));
        }
        let src = source_range(source, offset, length)?;
        self.buffer[self.count..required].copy_from_slice(src);
        self.count = required;
        Ok(())
    }

    /// Append the valid samples of `other`.
    pub fn try_extend_from_buffer(&mut self, other: &AudioBuffer) -> Result<(), CaptureError> {
        self.try_extend_from_slice(other.as_slice(), 0, other.count())
    }

    /// Set the logical length after writing through `as_mut_storage`.
    ///
    /// Clamped to capacity.
    pub fn override_count(&mut self, count: usize) {
        if count > self.capacity() {
            log::warn!(
                "override_count({}) exceeds capacity {}, clamping",
                count,
                self.capacity()
            );
        }
        self.count = count.min(self.capacity());
    }

    /// Append up to `samples` zeros. Stops quietly once the buffer is full.
    pub fn pad_audio_buffer(&mut self, samples: usize) {
        for _ in 0..samples {
            if self.try_add(0.0).is_err() {
                break;
            }
        }
    }

    /// Drop the first `samples` samples, shifting the rest to the front.
    pub fn skip_audio_samples(&mut self, samples: usize) {
        if samples >= self.count {
            self.clear();
            return;
        }
        self.buffer.copy_within(samples..self.count, 0);
        self.count -= samples;
    }

    fn overflow(&self, required: usize) -> CaptureError {
        CaptureError::CapacityExceeded {
            required,
            capacity: self.capacity(),
        }
    }
}

fn source_range(source: &[f32], offset: usize, length: usize) -> Result<&[f32], CaptureError> {
    offset
        .checked_add(length)
        .and_then(|end| source.get(offset..end))
        .ok_or(CaptureError::InvalidSourceRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, samples: &[f32]) -> AudioBuffer {
        let mut buf = AudioBuffer::new(capacity);
        buf.try_copy_from_slice(samples, 0, samples.len()).unwrap();
        buf
    }

    #[test]
    fn new_buffer_is_empty() {
        let buf = AudioBuffer::new(8);
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.count(), 0);
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn try_add_until_full() {
        let mut buf = AudioBuffer::new(2);
        buf.try_add(1.0).unwrap();
        buf.try_add(2.0).unwrap();
        assert!(buf.is_full());

        let err = buf.try_add(3.0).unwrap_err();
        assert_eq!(err, CaptureError::CapacityExceeded { required: 3, capacity: 2 });
        assert_eq!(buf.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn copy_replaces_existing_content() {
        let mut buf = filled(8, &[9.0, 9.0, 9.0, 9.0, 9.0]);
        buf.try_copy_from_slice(&[0.0, 1.0, 2.0, 3.0], 1, 2).unwrap();

        assert_eq!(buf.count(), 2);
        assert_eq!(buf.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn copy_exactly_capacity() {
        let source: Vec<f32> = (0..16).map(|i| i as f32 * 0.25).collect();
        let buf = filled(16, &source);
        assert_eq!(buf.as_slice(), source.as_slice());
    }

    #[test]
    fn oversized_copy_leaves_buffer_unchanged() {
        let mut buf = filled(4, &[1.0, 2.0, 3.0]);

        assert!(buf.try_copy_from_slice(&[0.0; 5], 0, 5).is_err());
        assert!(buf.try_extend_from_slice(&[0.0; 2], 0, 2).is_err());
        let big = filled(5, &[0.0; 5]);
        assert!(buf.try_copy_from_buffer(&big).is_err());

        assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn out_of_bounds_source_is_rejected() {
        let mut buf = filled(8, &[1.0]);
        let err = buf.try_copy_from_slice(&[1.0, 2.0], 1, 2).unwrap_err();
        assert_eq!(err, CaptureError::InvalidSourceRange);
        assert!(buf.try_extend_from_slice(&[1.0, 2.0], usize::MAX, 2).is_err());
        assert_eq!(buf.as_slice(), &[1.0]);
    }

    #[test]
    fn copy_from_raw_pointer() {
        let source = [0.5f32, -0.5, 0.25];
        let mut buf = AudioBuffer::new(4);
        let copied = unsafe { buf.try_copy_from_raw(source.as_ptr(), source.len()) };
        assert!(copied.is_ok());
        assert_eq!(buf.as_slice(), &source);

        let err = unsafe { buf.try_copy_from_raw(std::ptr::null(), 2) }.unwrap_err();
        assert_eq!(err, CaptureError::InvalidSourceRange);
        assert_eq!(buf.as_slice(), &source);

        let err = unsafe { buf.try_copy_from_raw(source.as_ptr(), 5) }.unwrap_err();
        assert!(matches!(err, CaptureError::CapacityExceeded { .. }));
    }

    #[test]
    fn copy_from_buffer_takes_only_valid_samples() {
        let mut other = AudioBuffer::new(10);
        other.try_extend_from_slice(&[1.0, 2.0], 0, 2).unwrap();

        let mut buf = AudioBuffer::new(2);
        buf.try_copy_from_buffer(&other).unwrap();
        assert_eq!(buf.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn extend_appends() {
        let mut buf = filled(6, &[1.0, 2.0]);
        buf.try_extend_from_slice(&[0.0, 3.0, 4.0], 1, 2).unwrap();
        let tail = filled(2, &[5.0, 6.0]);
        buf.try_extend_from_buffer(&tail).unwrap();

        assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(buf.try_extend_from_buffer(&tail).is_err());
    }

    #[test]
    fn extend_in_parts_matches_extend_once() {
        let a = [0.1f32, 0.2, 0.3];
        let b = [0.4f32, 0.5];
        let joined: Vec<f32> = a.iter().chain(b.iter()).copied().collect();

        let mut parts = AudioBuffer::new(8);
        parts.try_extend_from_slice(&a, 0, a.len()).unwrap();
        parts.try_extend_from_slice(&b, 0, b.len()).unwrap();

        let mut once = AudioBuffer::new(8);
        once.try_extend_from_slice(&joined, 0, joined.len()).unwrap();

        assert_eq!(parts.as_slice(), once.as_slice());
    }

    #[test]
    fn override_count_publishes_direct_writes() {
        let mut buf = AudioBuffer::new(4);
        buf.as_mut_storage()[..3].copy_from_slice(&[7.0, 8.0, 9.0]);
        buf.override_count(3);
        assert_eq!(buf.as_slice(), &[7.0, 8.0, 9.0]);

        buf.override_count(10);
        assert_eq!(buf.count(), 4);
    }

    #[test]
    fn pad_is_best_effort() {
        let mut buf = filled(5, &[1.0, 2.0]);
        buf.pad_audio_buffer(2);
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 0.0, 0.0]);

        buf.pad_audio_buffer(100);
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn skip_shifts_remaining_samples() {
        let mut buf = filled(8, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        buf.skip_audio_samples(2);
        assert_eq!(buf.as_slice(), &[3.0, 4.0, 5.0]);

        buf.skip_audio_samples(0);
        assert_eq!(buf.as_slice(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn skip_everything_clears() {
        let mut buf = filled(8, &[1.0, 2.0, 3.0]);
        buf.skip_audio_samples(3);
        assert!(buf.is_empty());

        let mut buf = filled(8, &[1.0, 2.0, 3.0]);
        buf.skip_audio_samples(50);
        assert!(buf.is_empty());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = filled(3, &[1.0, 2.0, 3.0]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 3);
        buf.try_copy_from_slice(&[4.0, 5.0, 6.0], 0, 3).unwrap();
        assert_eq!(buf.as_slice(), &[4.0, 5.0, 6.0]);
    }
}
