//! The backend's own verbosity, set through `set_global_log_level`.
//!
//! Records still go through the `log` facade, so the host logger's filter
//! applies on top. This level can only narrow what the backend emits; it
//! never touches `log::max_level`.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{Level, LevelFilter};
use mic_capture_core::NativeLogLevel;

#[derive(Debug)]
pub struct NativeLogFilter {
    level: AtomicUsize,
}

impl NativeLogFilter {
    pub fn new(level: NativeLogLevel) -> Self {
        Self {
            level: AtomicUsize::new(LevelFilter::from(level) as usize),
        }
    }

    pub fn set(&self, level: NativeLogLevel) {
        self.level
            .store(LevelFilter::from(level) as usize, Ordering::Relaxed);
    }

    pub fn enabled(&self, level: Level) -> bool {
        level as usize <= self.level.load(Ordering::Relaxed)
    }
}

impl Default for NativeLogFilter {
    fn default() -> Self {
        Self::new(NativeLogLevel::default())
    }
}

/// `log::log!` gated on a [`NativeLogFilter`].
macro_rules! native_log {
    ($filter:expr, $level:expr, $($arg:tt)+) => {
        if $filter.enabled($level) {
            log::log!($level, $($arg)+);
        }
    };
}

pub(crate) use native_log;
