use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use super::status::NativeLogLevel;

/// Configuration for a native capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Target sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Interleaved channels per delivered frame (default: 1).
    pub channels: u16,

    /// Seconds of audio the session buffer can hold (default: 1.0).
    pub buffer_duration_secs: f32,

    /// Verbosity forwarded to the native backend (default: warn).
    pub log_level: NativeLogLevel,
}

impl CaptureConfiguration {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2, 6].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.buffer_duration_secs.is_nan() || self.buffer_duration_secs <= 0.0 {
            return Err(format!(
                "buffer duration must be positive: {}",
                self.buffer_duration_secs
            ));
        }
        Ok(())
    }

    /// Number of samples the session buffer is sized for.
    pub fn buffer_capacity(&self) -> usize {
        let samples_per_second = self.sample_rate as usize * self.channels as usize;
        (self.buffer_duration_secs * samples_per_second as f32) as usize
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            buffer_duration_secs: 1.0,
            log_level: NativeLogLevel::Warn,
        }
    }
}
