use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Diagnostics for debugging capture sessions.
///
/// `samples_dropped` counts samples that never reached a consumer: the
/// excess of oversized deliveries, and samples overwritten by a later
/// delivery within the same poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureSessionDiagnostics {
    pub deliveries: u64,
    pub samples_delivered: u64,
    pub samples_dropped: u64,
    pub polls: u64,
    pub native_starts: u64,
    pub native_stops: u64,
    pub failed_transitions: u64,
}

/// Lock-free counters updated from capture and worker threads.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticCounters {
    pub deliveries: AtomicU64,
    pub samples_delivered: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub polls: AtomicU64,
    pub native_starts: AtomicU64,
    pub native_stops: AtomicU64,
    pub failed_transitions: AtomicU64,
}

impl DiagnosticCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureSessionDiagnostics {
        CaptureSessionDiagnostics {
            deliveries: self.deliveries.load(Ordering::Relaxed),
            samples_delivered: self.samples_delivered.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            native_starts: self.native_starts.load(Ordering::Relaxed),
            native_stops: self.native_stops.load(Ordering::Relaxed),
            failed_transitions: self.failed_transitions.load(Ordering::Relaxed),
        }
    }
}
