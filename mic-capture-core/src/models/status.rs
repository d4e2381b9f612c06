use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Status code returned by every call into a native capture backend.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Ok = 0,
    Error = 1,
    InvalidKey = 2,
    DefaultInputDeviceError = 3,
    BuildStreamError = 4,
}

impl NativeStatus {
    /// Decode a raw status code. Unknown codes collapse to `Error`.
    pub fn from_raw(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            2 => Self::InvalidKey,
            3 => Self::DefaultInputDeviceError,
            4 => Self::BuildStreamError,
            _ => Self::Error,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Convert into a `Result`, tagging failures with the native operation name.
    pub fn into_result(self, operation: &'static str) -> Result<(), CaptureError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(CaptureError::NativeCall {
                operation,
                status: self,
            })
        }
    }
}

/// Log verbosity understood by native backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeLogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<NativeLogLevel> for log::LevelFilter {
    fn from(level: NativeLogLevel) -> Self {
        match level {
            NativeLogLevel::Off => log::LevelFilter::Off,
            NativeLogLevel::Error => log::LevelFilter::Error,
            NativeLogLevel::Warn => log::LevelFilter::Warn,
            NativeLogLevel::Info => log::LevelFilter::Info,
            NativeLogLevel::Debug => log::LevelFilter::Debug,
            NativeLogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
