//! Scripted backend for session tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::status::{NativeLogLevel, NativeStatus};
use crate::traits::native_backend::{AudioDataCallback, NativeCaptureBackend};

// Shared across tests so concurrently running sessions never collide in the
// global registry.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Allocate(u32),
    Free(u64),
    Start(u64),
    Stop(u64),
    Pull(u64),
}

#[derive(Default)]
struct Gate {
    closed: bool,
    entered: usize,
}

pub struct ScriptedBackend {
    fixed_handle: Option<u64>,
    start_status: Mutex<NativeStatus>,
    stop_status: Mutex<NativeStatus>,
    pending: Mutex<Vec<Vec<f32>>>,
    separate_deliveries: AtomicBool,
    calls: Mutex<Vec<Call>>,
    log_level: Mutex<Option<NativeLogLevel>>,
    gate: Mutex<Gate>,
    gate_changed: Condvar,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::with_fixed_handle(None)
    }

    /// `Some(0)` simulates an allocation failure.
    pub fn with_fixed_handle(handle: Option<u64>) -> Self {
        Self {
            fixed_handle: handle,
            start_status: Mutex::new(NativeStatus::Ok),
            stop_status: Mutex::new(NativeStatus::Ok),
            pending: Mutex::new(Vec::new()),
            separate_deliveries: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            log_level: Mutex::new(None),
            gate: Mutex::new(Gate::default()),
            gate_changed: Condvar::new(),
        }
    }

    pub fn failing_allocation() -> Self {
        Self::with_fixed_handle(Some(0))
    }

    pub fn set_start_status(&self, status: NativeStatus) {
        *self.start_status.lock() = status;
    }

    pub fn set_stop_status(&self, status: NativeStatus) {
        *self.stop_status.lock() = status;
    }

    /// Queue a block for the next `pull_pending_audio`.
    pub fn push_block(&self, samples: Vec<f32>) {
        self.pending.lock().push(samples);
    }

    /// Deliver each queued block with its own callback instead of joining
    /// them into one delivery.
    pub fn deliver_separately(&self) {
        self.separate_deliveries.store(true, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    pub fn log_level(&self) -> Option<NativeLogLevel> {
        *self.log_level.lock()
    }

    /// Block start/stop calls until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.lock().closed = true;
    }

    pub fn release(&self) {
        self.gate.lock().closed = false;
        self.gate_changed.notify_all();
    }

    /// Wait until `n` start/stop calls have entered the backend.
    pub fn wait_entered(&self, n: usize) {
        let mut gate = self.gate.lock();
        while gate.entered < n {
            if self
                .gate_changed
                .wait_for(&mut gate, Duration::from_secs(5))
                .timed_out()
            {
                panic!("timed out waiting for {} native transitions", n);
            }
        }
    }

    fn pass_gate(&self) {
        let mut gate = self.gate.lock();
        gate.entered += 1;
        self.gate_changed.notify_all();
        while gate.closed {
            self.gate_changed.wait(&mut gate);
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl NativeCaptureBackend for ScriptedBackend {
    fn allocate(&self, sample_rate: u32) -> u64 {
        self.record(Call::Allocate(sample_rate));
        self.fixed_handle
            .unwrap_or_else(|| NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    fn free(&self, handle: u64) -> NativeStatus {
        self.record(Call::Free(handle));
        NativeStatus::Ok
    }

    fn start(&self, handle: u64) -> NativeStatus {
        self.pass_gate();
        self.record(Call::Start(handle));
        *self.start_status.lock()
    }

    fn stop(&self, handle: u64) -> NativeStatus {
        self.pass_gate();
        self.record(Call::Stop(handle));
        *self.stop_status.lock()
    }

    fn pull_pending_audio(&self, handle: u64, callback: AudioDataCallback) -> NativeStatus {
        self.record(Call::Pull(handle));
        let blocks = std::mem::take(&mut *self.pending.lock());
        if self.separate_deliveries.load(Ordering::Relaxed) {
            for block in &blocks {
                unsafe { callback(block.as_ptr(), block.len() as u32, handle) };
            }
        } else if !blocks.is_empty() {
            let joined = blocks.concat();
            unsafe { callback(joined.as_ptr(), joined.len() as u32, handle) };
        }
        NativeStatus::Ok
    }

    fn set_global_log_level(&self, level: NativeLogLevel) {
        *self.log_level.lock() = Some(level);
    }
}
