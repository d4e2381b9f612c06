//! # mic-capture-core
//!
//! Platform-agnostic native microphone capture core.
//!
//! Provides a fixed-capacity sample buffer, channel layout conversion, and a
//! capture session that drives an opaque native capture handle. Native
//! backends implement the `NativeCaptureBackend` trait and deliver audio
//! through a C callback that the process-wide registry routes back to the
//! owning session.
//!
//! ## Architecture
//!
//! ```text
//! mic-capture-core (this crate)
//! ├── traits/       ← NativeCaptureBackend, CaptureDelegate
//! ├── models/       ← CaptureError, NativeStatus, NativeLogLevel, CaptureConfiguration, CaptureState
//! ├── processing/   ← AudioBuffer, channel_mixing
//! └── session/      ← NativeCaptureSession, registry (handle → session routing)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::CaptureConfiguration;
pub use models::diagnostics::CaptureSessionDiagnostics;
pub use models::error::CaptureError;
pub use models::state::{CaptureRequest, CaptureState};
pub use models::status::{NativeLogLevel, NativeStatus};
pub use processing::audio_buffer::AudioBuffer;
pub use processing::channel_mixing;
pub use session::native_session::NativeCaptureSession;
pub use session::registry;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::native_backend::{AudioDataCallback, NativeCaptureBackend};
