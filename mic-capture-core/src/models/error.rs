use thiserror::Error;

use super::status::NativeStatus;

/// Errors that can occur during native capture operations.
///
/// Buffer operations return these instead of panicking; session operations
/// return them when the session has no live native handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("native allocation failed for {sample_rate} Hz")]
    AllocationFailed { sample_rate: u32 },

    #[error("capture session has no native handle")]
    NotInitialized,

    #[error("native {operation} returned {status:?}")]
    NativeCall {
        operation: &'static str,
        status: NativeStatus,
    },

    #[error("capacity exceeded: {required} samples needed, {capacity} available")]
    CapacityExceeded { required: usize, capacity: usize },

    #[error("source range out of bounds")]
    InvalidSourceRange,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("failed to spawn state-change worker: {0}")]
    WorkerSpawn(String),
}
