use crate::models::status::{NativeLogLevel, NativeStatus};

/// Callback a backend invokes to hand over captured audio.
///
/// Parameters:
/// - `data`: Pointer to `length` f32 samples, valid only for the call.
/// - `length`: Number of samples at `data`.
/// - `handle`: The capture handle the samples belong to.
pub type AudioDataCallback = unsafe extern "C" fn(data: *const f32, length: u32, handle: u64);

/// Interface to a native capture library.
///
/// Every call is synchronous from the caller's point of view and reports a
/// status code instead of panicking. Implemented by:
/// - `CpalCaptureBackend` (default input device)
/// - the scripted backend used in this crate's tests
pub trait NativeCaptureBackend: Send + Sync + 'static {
    /// Allocate a capture resource for `sample_rate`. Returns 0 on failure.
    fn allocate(&self, sample_rate: u32) -> u64;

    /// Release a capture resource, stopping it first if needed.
    fn free(&self, handle: u64) -> NativeStatus;

    fn start(&self, handle: u64) -> NativeStatus;

    fn stop(&self, handle: u64) -> NativeStatus;

    /// Deliver everything captured since the last pull.
    ///
    /// `callback` runs zero or more times on the calling thread before this
    /// returns. Each delivery replaces the session buffer, so backends that
    /// queue audio in chunks should hand it over as one contiguous block.
    fn pull_pending_audio(&self, handle: u64, callback: AudioDataCallback) -> NativeStatus;

    fn set_global_log_level(&self, level: NativeLogLevel);
}
