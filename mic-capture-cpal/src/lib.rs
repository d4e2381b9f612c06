//! # mic-capture-cpal
//!
//! Default input device backend for mic-capture-core.
//!
//! Provides:
//! - `CpalCaptureBackend`: `NativeCaptureBackend` implementation on the cpal default host
//! - `device_enumerator`: input device listing
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use mic_capture_core::{CaptureConfiguration, NativeCaptureSession};
//! use mic_capture_cpal::CpalCaptureBackend;
//!
//! let backend = Arc::new(CpalCaptureBackend::new());
//! let session = NativeCaptureSession::try_new(backend, CaptureConfiguration::default())?;
//! session.enable_capture()?;
//! ```

pub mod cpal_backend;
pub mod device_enumerator;
pub mod error;
mod log_filter;
pub mod pending;

pub use cpal_backend::CpalCaptureBackend;
pub use device_enumerator::{default_input_device, list_input_devices, InputDeviceInfo};
pub use error::BackendError;
