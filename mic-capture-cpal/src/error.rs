use thiserror::Error;

use mic_capture_core::NativeStatus;

/// Failures inside the cpal backend. Mapped to a [`NativeStatus`] at the
/// backend boundary; the message is logged.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no default input device")]
    NoInputDevice,

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to query input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("no f32 input config supports {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("stream thread failed: {0}")]
    StreamThread(String),
}

impl BackendError {
    pub fn status(&self) -> NativeStatus {
        match self {
            Self::NoInputDevice
            | Self::Devices(_)
            | Self::DefaultConfig(_)
            | Self::SupportedConfigs(_) => {
                NativeStatus::DefaultInputDeviceError
            }
            Self::UnsupportedSampleRate(_) | Self::BuildStream(_) | Self::PlayStream(_) => {
                NativeStatus::BuildStreamError
            }
            Self::StreamThread(_) => NativeStatus::Error,
        }
    }
}
