//! Input device enumeration via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::SampleFormat;

use crate::error::BackendError;

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    /// Channels of the device's default input config.
    pub channels: u16,
    /// Sample rate of the device's default input config.
    pub sample_rate: u32,
    /// Whether the default input config delivers f32 samples natively.
    pub native_f32: bool,
}

/// List active input devices on the default host.
///
/// Devices whose default config cannot be queried are skipped.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, BackendError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|device| device.name().ok());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = match device.default_input_config() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("skipping input device {}: {}", name, e);
                continue;
            }
        };
        devices.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
            native_f32: config.sample_format() == SampleFormat::F32,
            name,
        });
    }
    Ok(devices)
}

/// Describe the default input device.
pub fn default_input_device() -> Result<InputDeviceInfo, BackendError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(BackendError::NoInputDevice)?;
    let config = device.default_input_config()?;

    Ok(InputDeviceInfo {
        name: device.name().unwrap_or_else(|_| "Default".to_string()),
        is_default: true,
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        native_f32: config.sample_format() == SampleFormat::F32,
    })
}
