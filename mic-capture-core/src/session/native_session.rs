use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::models::config::CaptureConfiguration;
use crate::models::diagnostics::{CaptureSessionDiagnostics, DiagnosticCounters};
use crate::models::error::CaptureError;
use crate::models::state::{CaptureRequest, CaptureState};
use crate::processing::audio_buffer::AudioBuffer;
use crate::session::registry::{self, CaptureSink};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::native_backend::NativeCaptureBackend;

/// Transition bookkeeping, protected by `parking_lot::Mutex`.
#[derive(Default)]
struct ControlState {
    /// Latest request that arrived while a transition was in flight.
    pending: CaptureRequest,
    in_flight: bool,
    disposing: bool,
    worker: Option<thread::JoinHandle<()>>,
}

/// State shared between the session and its state-change worker.
struct SessionShared<B: NativeCaptureBackend> {
    backend: Arc<B>,
    handle: AtomicU64,
    capturing: AtomicBool,
    control: Mutex<ControlState>,
    idle: Condvar,
    sink: Arc<CaptureSink>,
    delegate: RwLock<Option<Arc<dyn CaptureDelegate>>>,
}

impl<B: NativeCaptureBackend> SessionShared<B> {
    fn handle(&self) -> u64 {
        self.handle.load(Ordering::Acquire)
    }

    fn current_state(&self) -> CaptureState {
        CaptureState::from_capturing(self.capturing.load(Ordering::Acquire))
    }

    /// Worker body: apply `first`, then keep applying whatever was requested
    /// meanwhile until nothing is pending.
    fn run_transitions(&self, first: CaptureRequest) {
        let mut request = first;
        loop {
            if let Some(target) = request.target() {
                self.apply(target);
            }

            let mut control = self.control.lock();
            request = if control.disposing {
                CaptureRequest::NoChange
            } else {
                control.pending.take()
            };
            if request == CaptureRequest::NoChange {
                control.in_flight = false;
                self.idle.notify_all();
                return;
            }
        }
    }

    /// Wait until no transition is in flight and reap the finished worker.
    ///
    /// Returns immediately when called from the worker itself (a delegate
    /// callback calling back into the session).
    fn wait_idle(&self) {
        let worker = {
            let mut control = self.control.lock();
            let on_worker = control
                .worker
                .as_ref()
                .is_some_and(|w| w.thread().id() == thread::current().id());
            if on_worker {
                return;
            }
            while control.in_flight {
                self.idle.wait(&mut control);
            }
            control.worker.take()
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("state-change worker panicked");
            }
        }
    }

    fn apply(&self, target: CaptureState) {
        let handle = self.handle();
        if handle == 0 || self.control.lock().disposing {
            return;
        }
        if self.current_state() == target {
            log::debug!("capture session {} already {:?}", handle, target);
            return;
        }

        let counters = &self.sink.counters;
        let (operation, status) = match target {
            CaptureState::Capturing => {
                DiagnosticCounters::bump(&counters.native_starts, 1);
                ("start", self.backend.start(handle))
            }
            CaptureState::Idle => {
                DiagnosticCounters::bump(&counters.native_stops, 1);
                ("stop", self.backend.stop(handle))
            }
        };

        let delegate = self.delegate.read().clone();
        match status.into_result(operation) {
            Ok(()) => {
                self.capturing.store(target.is_capturing(), Ordering::Release);
                log::info!("capture session {} is now {:?}", handle, target);
                if let Some(d) = delegate {
                    d.on_state_changed(handle, target);
                }
            }
            Err(e) => {
                DiagnosticCounters::bump(&counters.failed_transitions, 1);
                log::warn!("capture session {}: {}", handle, e);
                if let Some(d) = delegate {
                    d.on_error(handle, &e);
                }
            }
        }
    }
}

/// Capture session bound to one native capture handle.
///
/// Enable/disable requests are applied asynchronously by a single background
/// worker per session. Requests that arrive while the worker is busy are
/// coalesced to the latest one and applied after the in-flight transition,
/// so rapid toggling costs at most one extra native round trip.
///
/// ```text
/// [native thread] → audio_data_bridge → registry → CaptureSink ─┐
///                                                               ├→ get_audio_data(f)
/// enable/disable → pending request → worker → backend.start/stop┘
/// ```
///
/// If allocation fails the session is permanently unusable: every operation
/// returns [`CaptureError::NotInitialized`] and no native call is issued.
pub struct NativeCaptureSession<B: NativeCaptureBackend> {
    shared: Arc<SessionShared<B>>,
    config: CaptureConfiguration,
    poll_lock: Mutex<()>,
}

impl<B: NativeCaptureBackend> NativeCaptureSession<B> {
    pub fn new(backend: Arc<B>, config: CaptureConfiguration) -> Self {
        let (handle, capacity) = match config.validate() {
            Ok(()) => {
                backend.set_global_log_level(config.log_level);
                let handle = backend.allocate(config.sample_rate);
                if handle == 0 {
                    log::error!(
                        "native allocation failed for {} Hz, capture session is unusable",
                        config.sample_rate
                    );
                }
                (handle, config.buffer_capacity())
            }
            Err(reason) => {
                log::error!("invalid capture configuration, capture session is unusable: {}", reason);
                (0, 0)
            }
        };

        let sink = Arc::new(CaptureSink::new(capacity));
        if handle != 0 {
            registry::register(handle, Arc::clone(&sink));
            log::info!(
                "capture session {} allocated at {} Hz ({} sample buffer)",
                handle,
                config.sample_rate,
                capacity
            );
        }

        Self {
            shared: Arc::new(SessionShared {
                backend,
                handle: AtomicU64::new(handle),
                capturing: AtomicBool::new(false),
                control: Mutex::new(ControlState::default()),
                idle: Condvar::new(),
                sink,
                delegate: RwLock::new(None),
            }),
            config,
            poll_lock: Mutex::new(()),
        }
    }

    /// Like [`new`](Self::new), but fails instead of returning an unusable session.
    pub fn try_new(backend: Arc<B>, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        let sample_rate = config.sample_rate;
        let session = Self::new(backend, config);
        if session.is_valid() {
            Ok(session)
        } else {
            Err(CaptureError::AllocationFailed { sample_rate })
        }
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.shared.delegate.write() = Some(delegate);
    }

    /// Native handle, or 0 if allocation failed or the session was disposed.
    pub fn handle(&self) -> u64 {
        self.shared.handle()
    }

    pub fn is_valid(&self) -> bool {
        self.handle() != 0
    }

    pub fn is_capturing(&self) -> bool {
        self.shared.capturing.load(Ordering::Acquire)
    }

    pub fn state(&self) -> CaptureState {
        self.shared.current_state()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.shared.sink.diagnostics()
    }

    /// Request capture on. Returns once the request is queued, not applied.
    pub fn enable_capture(&self) -> Result<(), CaptureError> {
        self.request(CaptureRequest::Enable)
    }

    /// Request capture off. Returns once the request is queued, not applied.
    pub fn disable_capture(&self) -> Result<(), CaptureError> {
        self.request(CaptureRequest::Disable)
    }

    /// Block until the in-flight transition (and anything it replays) is done.
    pub fn wait_for_state_change(&self) {
        self.shared.wait_idle();
    }

    /// Drain pending native audio into the session buffer and hand it to `f`.
    ///
    /// Never waits for new audio. When not capturing, `f` receives an empty
    /// buffer. `f` runs with the buffer locked and must not poll this session
    /// again.
    pub fn get_audio_data<F>(&self, f: F) -> Result<(), CaptureError>
    where
        F: FnOnce(&AudioBuffer),
    {
        let handle = self.handle();
        if handle == 0 {
            return Err(CaptureError::NotInitialized);
        }

        let _poll = self.poll_lock.lock();
        let sink = &self.shared.sink;
        DiagnosticCounters::bump(&sink.counters.polls, 1);
        sink.clear();

        if self.is_capturing() {
            let status = self
                .shared
                .backend
                .pull_pending_audio(handle, registry::audio_data_bridge);
            if let Err(e) = status.into_result("pull_pending_audio") {
                log::warn!("capture session {}: {}", handle, e);
            }
        }

        sink.with_buffer(f);
        Ok(())
    }

    /// Release the native handle. Waits for an in-flight transition first.
    /// Calling this more than once is a no-op.
    pub fn dispose(&self) {
        {
            let mut control = self.shared.control.lock();
            if control.disposing || self.handle() == 0 {
                return;
            }
            control.disposing = true;
            control.pending = CaptureRequest::NoChange;
        }
        self.shared.wait_idle();

        let _poll = self.poll_lock.lock();
        let handle = self.shared.handle.swap(0, Ordering::AcqRel);
        if handle == 0 {
            return;
        }
        if let Err(e) = self.shared.backend.free(handle).into_result("free") {
            log::warn!("capture session {}: {}", handle, e);
        }
        registry::unregister(handle);
        self.shared.capturing.store(false, Ordering::Release);
        log::info!("capture session {} disposed", handle);
    }

    fn request(&self, request: CaptureRequest) -> Result<(), CaptureError> {
        if self.handle() == 0 {
            return Err(CaptureError::NotInitialized);
        }

        let mut control = self.shared.control.lock();
        if control.disposing {
            return Err(CaptureError::NotInitialized);
        }
        if control.in_flight {
            control.pending = request;
            return Ok(());
        }

        control.pending = CaptureRequest::NoChange;
        let shared = Arc::clone(&self.shared);
        let worker = thread::Builder::new()
            .name("mic-capture-state".into())
            .spawn(move || shared.run_transitions(request))
            .map_err(|e| {
                log::error!("failed to spawn state-change worker: {}", e);
                CaptureError::WorkerSpawn(e.to_string())
            })?;
        control.in_flight = true;
        control.worker = Some(worker);
        Ok(())
    }
}

impl<B: NativeCaptureBackend> Drop for NativeCaptureSession<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
