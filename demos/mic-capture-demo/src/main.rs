//! Polls the default microphone through a native capture session and prints
//! a level meter.
//!
//! ```text
//! mic-capture-demo [--list-devices] [--seconds N] [--config path.json]
//! ```

mod delegate;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mic_capture_core::{channel_mixing, registry, CaptureConfiguration, CaptureError, NativeCaptureSession};
use mic_capture_cpal::{list_input_devices, CpalCaptureBackend};

use delegate::LoggingDelegate;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Options {
    list_devices: bool,
    seconds: u64,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        list_devices: false,
        seconds: 5,
        config_path: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--list-devices" => options.list_devices = true,
            "--seconds" => {
                let value = args.next().ok_or("--seconds needs a value")?;
                options.seconds = value
                    .parse()
                    .map_err(|_| format!("invalid --seconds value: {}", value))?;
            }
            "--config" => {
                let value = args.next().ok_or("--config needs a path")?;
                options.config_path = Some(PathBuf::from(value));
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(options)
}

fn load_config(path: Option<&PathBuf>) -> Result<CaptureConfiguration, CaptureError> {
    let Some(path) = path else {
        return Ok(CaptureConfiguration::default());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| CaptureError::ConfigurationFailed(format!("{}: {}", path.display(), e)))?;
    CaptureConfiguration::from_json(&json)
}

fn meter(level: f32) -> String {
    let width = (level.clamp(0.0, 1.0) * 40.0).round() as usize;
    format!("{:<40}", "#".repeat(width))
}

fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    if options.list_devices {
        for device in list_input_devices()? {
            println!(
                "{}{} ({} ch @ {} Hz{})",
                if device.is_default { "* " } else { "  " },
                device.name,
                device.channels,
                device.sample_rate,
                if device.native_f32 { "" } else { ", non-f32" }
            );
        }
        return Ok(());
    }

    let config = load_config(options.config_path.as_ref())?;
    let backend = Arc::new(CpalCaptureBackend::new());
    let session = NativeCaptureSession::try_new(backend, config)?;
    session.set_delegate(Arc::new(LoggingDelegate));

    session.enable_capture()?;
    session.wait_for_state_change();
    if !session.is_capturing() {
        return Err("microphone did not start, see log for the native status".into());
    }

    let deadline = Instant::now() + Duration::from_secs(options.seconds);
    while Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
        session.get_audio_data(|buffer| {
            let samples = buffer.as_slice();
            let rms = channel_mixing::rms_level(samples);
            let peak = channel_mixing::peak_level(samples);
            println!("{} rms {:.3} peak {:.3} ({} samples)", meter(rms), rms, peak, samples.len());
        })?;
    }

    session.disable_capture()?;
    session.wait_for_state_change();

    let diagnostics = session.diagnostics();
    println!(
        "deliveries {} samples {} dropped {} polls {}",
        diagnostics.deliveries, diagnostics.samples_delivered, diagnostics.samples_dropped, diagnostics.polls
    );

    session.dispose();
    registry::shutdown();
    Ok(())
}

fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
