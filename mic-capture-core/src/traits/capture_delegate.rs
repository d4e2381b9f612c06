use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// All methods are called from the session's state-change worker thread,
/// never while a session lock is held.
pub trait CaptureDelegate: Send + Sync {
    /// Called after a native start/stop call changed the capture state.
    fn on_state_changed(&self, handle: u64, state: CaptureState);

    /// Called when a native start/stop call failed.
    fn on_error(&self, handle: u64, error: &CaptureError);
}
