//! Process-wide routing table from native capture handle to session sink.
//!
//! Native backends report captured audio through a plain C callback that
//! carries nothing but the handle, so every live session registers its sink
//! here. The table is created on first use and torn down with [`shutdown`].
//! Writers are the owning threads (construct/dispose); readers are whatever
//! thread the backend delivers on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::models::diagnostics::{CaptureSessionDiagnostics, DiagnosticCounters};
use crate::processing::audio_buffer::AudioBuffer;

/// Delivery target for one session: its buffer plus counters.
#[derive(Debug)]
pub(crate) struct CaptureSink {
    buffer: Mutex<AudioBuffer>,
    pub(crate) counters: DiagnosticCounters,
}

impl CaptureSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(AudioBuffer::new(capacity)),
            counters: DiagnosticCounters::default(),
        }
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn with_buffer<R>(&self, f: impl FnOnce(&AudioBuffer) -> R) -> R {
        let buffer = self.buffer.lock();
        f(&*buffer)
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.counters.snapshot()
    }

    /// Copy one native delivery into the buffer, replacing its contents.
    ///
    /// Samples beyond capacity are dropped and logged, as are samples an
    /// earlier delivery of the same poll left in the buffer.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `length` samples.
    pub unsafe fn ingest(&self, handle: u64, data: *const f32, length: usize) {
        DiagnosticCounters::bump(&self.counters.deliveries, 1);

        let mut buffer = self.buffer.lock();
        if !buffer.is_empty() {
            log::warn!(
                "handle {}: delivery overwrites {} unread samples",
                handle,
                buffer.count()
            );
            DiagnosticCounters::bump(&self.counters.samples_dropped, buffer.count() as u64);
        }
        let accepted = length.min(buffer.capacity());
        if accepted < length {
            log::warn!(
                "handle {}: delivery of {} samples exceeds buffer capacity {}, dropping {}",
                handle,
                length,
                buffer.capacity(),
                length - accepted
            );
            DiagnosticCounters::bump(&self.counters.samples_dropped, (length - accepted) as u64);
        }

        match buffer.try_copy_from_raw(data, accepted) {
            Ok(()) => DiagnosticCounters::bump(&self.counters.samples_delivered, accepted as u64),
            Err(e) => {
                log::error!("handle {}: discarding delivery of {} samples: {}", handle, length, e);
                DiagnosticCounters::bump(&self.counters.samples_dropped, accepted as u64);
            }
        }
    }
}

/// Handle → sink table.
#[derive(Debug, Default)]
pub(crate) struct CaptureRegistry {
    sinks: RwLock<HashMap<u64, Arc<CaptureSink>>>,
    misses: AtomicU64,
}

impl CaptureRegistry {
    pub fn register(&self, handle: u64, sink: Arc<CaptureSink>) {
        if self.sinks.write().insert(handle, sink).is_some() {
            log::warn!("handle {} was already registered, replacing its sink", handle);
        }
    }

    pub fn unregister(&self, handle: u64) -> bool {
        self.sinks.write().remove(&handle).is_some()
    }

    pub fn lookup(&self, handle: u64) -> Option<Arc<CaptureSink>> {
        self.sinks.read().get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn record_miss(&self, handle: u64, length: u32) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "no capture session registered for handle {}, discarding {} samples",
            handle,
            length
        );
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every entry, returning the handles that were still registered.
    pub fn drain(&self) -> Vec<u64> {
        let mut sinks = self.sinks.write();
        let handles: Vec<u64> = sinks.keys().copied().collect();
        sinks.clear();
        handles
    }
}

static REGISTRY: Lazy<CaptureRegistry> = Lazy::new(|| {
    log::debug!("capture registry initialized");
    CaptureRegistry::default()
});

pub(crate) fn register(handle: u64, sink: Arc<CaptureSink>) {
    REGISTRY.register(handle, sink);
}

pub(crate) fn unregister(handle: u64) -> bool {
    REGISTRY.unregister(handle)
}

pub(crate) fn lookup(handle: u64) -> Option<Arc<CaptureSink>> {
    REGISTRY.lookup(handle)
}

/// Whether a live session owns `handle`.
pub fn contains(handle: u64) -> bool {
    lookup(handle).is_some()
}

/// Number of live registered sessions.
pub fn len() -> usize {
    REGISTRY.len()
}

pub fn is_empty() -> bool {
    len() == 0
}

/// Deliveries discarded because no session owned their handle.
pub fn dropped_deliveries() -> u64 {
    REGISTRY.misses()
}

/// Tear down the registry. Sessions still registered are logged as leaked;
/// their later deliveries are discarded as misses.
pub fn shutdown() {
    teardown(&REGISTRY);
}

fn teardown(registry: &CaptureRegistry) -> Vec<u64> {
    let leaked = registry.drain();
    for handle in &leaked {
        log::warn!("capture session {} still registered at shutdown", handle);
    }
    leaked
}

/// Native delivery entry point handed to [`NativeCaptureBackend::pull_pending_audio`].
///
/// # Safety
///
/// `data` must be valid for reads of `length` samples for the duration of
/// the call.
///
/// [`NativeCaptureBackend::pull_pending_audio`]: crate::traits::native_backend::NativeCaptureBackend::pull_pending_audio
pub unsafe extern "C" fn audio_data_bridge(data: *const f32, length: u32, handle: u64) {
    route_delivery(&REGISTRY, data, length, handle);
}

unsafe fn route_delivery(registry: &CaptureRegistry, data: *const f32, length: u32, handle: u64) {
    match registry.lookup(handle) {
        Some(sink) => sink.ingest(handle, data, length as usize),
        None => registry.record_miss(handle, length),
    }
}
