//! Default input device capture through cpal.
//!
//! Each allocated handle owns a bounded sample queue. Starting a handle opens
//! the default input device on a dedicated owner thread (cpal streams are not
//! `Send` on every platform) which keeps the stream alive until stopped. The
//! device callback downmixes to mono and appends to the queue;
//! `pull_pending_audio` hands the whole queue over as one contiguous block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate};
use log::Level;
use parking_lot::Mutex;

use mic_capture_core::channel_mixing;
use mic_capture_core::{AudioDataCallback, NativeCaptureBackend, NativeLogLevel, NativeStatus};

use crate::error::BackendError;
use crate::log_filter::{native_log, NativeLogFilter};
use crate::pending::PendingAudio;

/// Default seconds of audio queued per handle between pulls.
pub const DEFAULT_MAX_PENDING_SECS: f32 = 2.0;

/// Owner thread keeping a running cpal stream alive.
struct StreamThread {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl StreamThread {
    fn shutdown(self, log_filter: &NativeLogFilter) {
        // The owner thread also exits if the sender is dropped.
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            native_log!(log_filter, Level::Error, "input stream thread panicked");
        }
    }
}

struct CaptureSlot {
    sample_rate: u32,
    pending: Arc<Mutex<PendingAudio>>,
    stream: Option<StreamThread>,
}

/// [`NativeCaptureBackend`] on the default cpal input device.
///
/// Delivers mono f32 at the allocated sample rate.
pub struct CpalCaptureBackend {
    next_handle: AtomicU64,
    slots: Mutex<HashMap<u64, CaptureSlot>>,
    max_pending_secs: f32,
    log_filter: Arc<NativeLogFilter>,
}

impl CpalCaptureBackend {
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_SECS)
    }

    /// Bound each handle's queue to `max_pending_secs` of audio.
    pub fn with_max_pending(max_pending_secs: f32) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            max_pending_secs,
            log_filter: Arc::new(NativeLogFilter::default()),
        }
    }

    /// Number of live handles.
    pub fn allocated(&self) -> usize {
        self.slots.lock().len()
    }

    /// Samples dropped for `handle` because nobody pulled in time.
    pub fn dropped_samples(&self, handle: u64) -> Option<u64> {
        let slots = self.slots.lock();
        slots.get(&handle).map(|slot| slot.pending.lock().dropped())
    }

    /// Whether the backend emits records at `level`.
    pub fn log_enabled(&self, level: Level) -> bool {
        self.log_filter.enabled(level)
    }

    fn spawn_stream(&self, sample_rate: u32, pending: Arc<Mutex<PendingAudio>>) -> Result<StreamThread, BackendError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), BackendError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let log_filter = Arc::clone(&self.log_filter);

        let handle = thread::Builder::new()
            .name("mic-capture-cpal-stream".into())
            .spawn(move || match open_input_stream(sample_rate, pending, log_filter) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop is requested or the backend is dropped.
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| BackendError::StreamThread(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(StreamThread { stop_tx, handle }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(BackendError::StreamThread("stream thread exited before reporting".into()))
            }
        }
    }
}

impl Default for CpalCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeCaptureBackend for CpalCaptureBackend {
    fn allocate(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            native_log!(self.log_filter, Level::Error, "refusing to allocate capture at 0 Hz");
            return 0;
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let limit = (sample_rate as f32 * self.max_pending_secs) as usize;
        self.slots.lock().insert(
            handle,
            CaptureSlot {
                sample_rate,
                pending: Arc::new(Mutex::new(PendingAudio::new(limit))),
                stream: None,
            },
        );
        native_log!(self.log_filter, Level::Debug, "allocated capture handle {} at {} Hz", handle, sample_rate);
        handle
    }

    fn free(&self, handle: u64) -> NativeStatus {
        let Some(slot) = self.slots.lock().remove(&handle) else {
            return NativeStatus::InvalidKey;
        };
        if let Some(stream) = slot.stream {
            stream.shutdown(&self.log_filter);
        }
        native_log!(self.log_filter, Level::Debug, "freed capture handle {}", handle);
        NativeStatus::Ok
    }

    fn start(&self, handle: u64) -> NativeStatus {
        let (sample_rate, pending) = {
            let slots = self.slots.lock();
            let Some(slot) = slots.get(&handle) else {
                return NativeStatus::InvalidKey;
            };
            if slot.stream.is_some() {
                return NativeStatus::Ok;
            }
            (slot.sample_rate, Arc::clone(&slot.pending))
        };

        let stream = match self.spawn_stream(sample_rate, pending) {
            Ok(stream) => stream,
            Err(e) => {
                native_log!(self.log_filter, Level::Error, "capture handle {}: {}", handle, e);
                return e.status();
            }
        };

        let mut slots = self.slots.lock();
        match slots.get_mut(&handle) {
            Some(slot) => {
                slot.stream = Some(stream);
                native_log!(self.log_filter, Level::Info, "capture handle {} started at {} Hz", handle, sample_rate);
                NativeStatus::Ok
            }
            None => {
                // Freed while the device was opening.
                drop(slots);
                stream.shutdown(&self.log_filter);
                NativeStatus::InvalidKey
            }
        }
    }

    fn stop(&self, handle: u64) -> NativeStatus {
        let (stream, pending) = {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.get_mut(&handle) else {
                return NativeStatus::InvalidKey;
            };
            (slot.stream.take(), Arc::clone(&slot.pending))
        };
        if let Some(stream) = stream {
            stream.shutdown(&self.log_filter);
            native_log!(self.log_filter, Level::Info, "capture handle {} stopped", handle);
        }
        // After shutdown, so nothing captured before the stop survives into
        // the next start.
        pending.lock().clear();
        NativeStatus::Ok
    }

    fn pull_pending_audio(&self, handle: u64, callback: AudioDataCallback) -> NativeStatus {
        let pending = {
            let slots = self.slots.lock();
            let Some(slot) = slots.get(&handle) else {
                return NativeStatus::InvalidKey;
            };
            Arc::clone(&slot.pending)
        };

        let mut samples = Vec::new();
        pending.lock().drain_into(&mut samples);
        if samples.is_empty() {
            return NativeStatus::Ok;
        }
        let Ok(length) = u32::try_from(samples.len()) else {
            native_log!(self.log_filter, Level::Warn, "capture handle {}: discarding {} queued samples", handle, samples.len());
            return NativeStatus::Error;
        };
        unsafe { callback(samples.as_ptr(), length, handle) };
        NativeStatus::Ok
    }

    fn set_global_log_level(&self, level: NativeLogLevel) {
        self.log_filter.set(level);
    }
}

impl Drop for CpalCaptureBackend {
    fn drop(&mut self) {
        for (handle, slot) in self.slots.get_mut().drain() {
            if let Some(stream) = slot.stream {
                native_log!(self.log_filter, Level::Debug, "stopping capture handle {} on backend drop", handle);
                stream.shutdown(&self.log_filter);
            }
        }
    }
}

/// Open and start the default input device at `sample_rate`, appending mono
/// samples to `pending`.
fn open_input_stream(
    sample_rate: u32,
    pending: Arc<Mutex<PendingAudio>>,
    log_filter: Arc<NativeLogFilter>,
) -> Result<cpal::Stream, BackendError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(BackendError::NoInputDevice)?;

    let supported = device
        .supported_input_configs()?
        .filter(|range| range.sample_format() == SampleFormat::F32)
        .find(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .ok_or(BackendError::UnsupportedSampleRate(sample_rate))?;

    let config: cpal::StreamConfig = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;
    native_log!(
        log_filter,
        Level::Debug,
        "opening {} with {} channel(s) at {} Hz",
        device.name().unwrap_or_else(|_| "input device".into()),
        channels,
        sample_rate
    );

    // Grows to the device's block size on the first callbacks, then reused.
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if channels <= 1 {
                pending.lock().push(data);
            } else {
                channel_mixing::downmix_to_mono_into(data, channels, &mut scratch);
                pending.lock().push(&scratch);
            }
        },
        move |err| native_log!(log_filter, Level::Warn, "input stream error: {}", err),
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    static DELIVERIES: Mutex<Vec<(u64, Vec<f32>)>> = parking_lot::const_mutex(Vec::new());

    unsafe extern "C" fn record_delivery(data: *const f32, length: u32, handle: u64) {
        let samples = std::slice::from_raw_parts(data, length as usize).to_vec();
        DELIVERIES.lock().push((handle, samples));
    }

    unsafe extern "C" fn never_called(_data: *const f32, _length: u32, _handle: u64) {
        panic!("no audio should be delivered");
    }

    fn pending_for(backend: &CpalCaptureBackend, handle: u64) -> Arc<Mutex<PendingAudio>> {
        Arc::clone(&backend.slots.lock()[&handle].pending)
    }

    #[test]
    fn handles_are_unique_and_nonzero() {
        let backend = CpalCaptureBackend::new();
        let a = backend.allocate(48000);
        let b = backend.allocate(16000);

        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
        assert_eq!(backend.allocated(), 2);
    }

    #[test]
    fn zero_rate_allocation_fails() {
        let backend = CpalCaptureBackend::new();
        assert_eq!(backend.allocate(0), 0);
        assert_eq!(backend.allocated(), 0);
    }

    #[test]
    fn unknown_handle_is_invalid_key() {
        let backend = CpalCaptureBackend::new();
        assert_eq!(backend.start(77), NativeStatus::InvalidKey);
        assert_eq!(backend.stop(77), NativeStatus::InvalidKey);
        assert_eq!(backend.free(77), NativeStatus::InvalidKey);
        assert_eq!(backend.pull_pending_audio(77, never_called), NativeStatus::InvalidKey);
    }

    #[test]
    fn idle_handle_stops_pulls_and_frees_cleanly() {
        let backend = CpalCaptureBackend::new();
        let handle = backend.allocate(48000);

        assert_eq!(backend.stop(handle), NativeStatus::Ok);
        assert_eq!(backend.pull_pending_audio(handle, never_called), NativeStatus::Ok);
        assert_eq!(backend.dropped_samples(handle), Some(0));
        assert_eq!(backend.free(handle), NativeStatus::Ok);
        assert_eq!(backend.free(handle), NativeStatus::InvalidKey);
        assert_eq!(backend.dropped_samples(handle), None);
    }

    #[test]
    fn pull_hands_over_every_queued_block_at_once() {
        let backend = CpalCaptureBackend::new();
        let handle = backend.allocate(48000);
        let pending = pending_for(&backend, handle);

        let blocks: Vec<Vec<f32>> = (0..10).map(|b| vec![b as f32; 480]).collect();
        for block in &blocks {
            pending.lock().push(block);
        }

        assert_eq!(backend.pull_pending_audio(handle, record_delivery), NativeStatus::Ok);

        let delivered: Vec<Vec<f32>> = DELIVERIES
            .lock()
            .iter()
            .filter(|(h, _)| *h == handle)
            .map(|(_, samples)| samples.clone())
            .collect();
        assert_eq!(delivered, vec![blocks.concat()]);
        assert!(pending.lock().is_empty());
    }

    #[test]
    fn stop_discards_queued_audio() {
        let backend = CpalCaptureBackend::new();
        let handle = backend.allocate(48000);
        let pending = pending_for(&backend, handle);
        pending.lock().push(&[0.5; 64]);

        assert_eq!(backend.stop(handle), NativeStatus::Ok);

        assert!(pending.lock().is_empty());
        assert_eq!(backend.pull_pending_audio(handle, never_called), NativeStatus::Ok);
    }

    #[test]
    fn queue_limit_follows_sample_rate() {
        let backend = CpalCaptureBackend::with_max_pending(0.5);
        let handle = backend.allocate(1000);
        let pending = pending_for(&backend, handle);

        pending.lock().push(&[0.0; 400]);
        pending.lock().push(&[0.0; 400]);

        assert_eq!(pending.lock().len(), 500);
        assert_eq!(backend.dropped_samples(handle), Some(300));
    }

    #[test]
    fn native_log_level_leaves_host_filter_alone() {
        log::set_max_level(log::LevelFilter::Trace);
        let backend = CpalCaptureBackend::new();

        backend.set_global_log_level(NativeLogLevel::Warn);

        assert_eq!(log::max_level(), log::LevelFilter::Trace);
        assert!(backend.log_enabled(Level::Warn));
        assert!(!backend.log_enabled(Level::Info));

        backend.set_global_log_level(NativeLogLevel::Debug);
        assert!(backend.log_enabled(Level::Debug));
        assert_eq!(log::max_level(), log::LevelFilter::Trace);
    }
}
