use mic_capture_core::{CaptureDelegate, CaptureError, CaptureState};

/// CaptureDelegate that reports transitions through the log.
pub struct LoggingDelegate;

impl CaptureDelegate for LoggingDelegate {
    fn on_state_changed(&self, handle: u64, state: CaptureState) {
        let name = match state {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
        };
        log::info!("session {} -> {}", handle, name);
    }

    fn on_error(&self, handle: u64, error: &CaptureError) {
        log::error!("session {}: {}", handle, error);
    }
}
