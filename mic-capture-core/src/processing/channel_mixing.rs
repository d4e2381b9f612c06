//! Channel layout conversion into [`AudioBuffer`]s.
//!
//! All functions are stateless. Converters that write into an `AudioBuffer`
//! clear it first and stop quietly before the first output frame that no
//! longer fits, so the output never ends in a partial frame. The return
//! value is the number of output frames actually written.

use crate::models::error::CaptureError;
use crate::processing::audio_buffer::AudioBuffer;

/// Samples per interleaved 5.1 frame: FL, FR, C, LFE, BL, BR.
pub const FIVE_ONE_CHANNELS: usize = 6;

const FRONT_GAIN: f32 = 0.707;
const CENTER_GAIN: f32 = 0.5;
const BACK_GAIN: f32 = 0.354;

/// Duplicate each mono sample into both stereo channels (L = R = input).
///
/// No level compensation is applied.
pub fn mono_to_stereo(
    source: &[f32],
    offset: usize,
    length: usize,
    out: &mut AudioBuffer,
) -> Result<usize, CaptureError> {
    let input = source_range(source, offset, length)?;
    out.clear();

    let mut frames = 0;
    for &sample in input {
        if !push_frame(out, &[sample, sample]) {
            break;
        }
        frames += 1;
    }
    Ok(frames)
}

/// Downmix interleaved 5.1 into interleaved stereo.
///
/// ```text
/// L = 0.707·FL + 0.5·C + 0.354·BL
/// R = 0.707·FR + 0.5·C + 0.354·BR
/// ```
/// LFE is discarded. A trailing partial frame is dropped.
pub fn five_one_to_stereo(
    source: &[f32],
    offset: usize,
    length: usize,
    out: &mut AudioBuffer,
) -> Result<usize, CaptureError> {
    let input = source_range(source, offset, length)?;
    out.clear();

    let mut frames = 0;
    for frame in input.chunks_exact(FIVE_ONE_CHANNELS) {
        let (fl, fr, c, bl, br) = (frame[0], frame[1], frame[2], frame[4], frame[5]);
        let left = FRONT_GAIN * fl + CENTER_GAIN * c + BACK_GAIN * bl;
        let right = FRONT_GAIN * fr + CENTER_GAIN * c + BACK_GAIN * br;
        if !push_frame(out, &[left, right]) {
            break;
        }
        frames += 1;
    }
    Ok(frames)
}

/// Average interleaved stereo down to mono.
pub fn stereo_to_mono(
    source: &[f32],
    offset: usize,
    length: usize,
    out: &mut AudioBuffer,
) -> Result<usize, CaptureError> {
    let input = source_range(source, offset, length)?;
    out.clear();

    let mut frames = 0;
    for frame in input.chunks_exact(2) {
        if !push_frame(out, &[(frame[0] + frame[1]) * 0.5]) {
            break;
        }
        frames += 1;
    }
    Ok(frames)
}

/// Downmix interleaved multi-channel audio to mono by averaging each frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    let mut mono = Vec::with_capacity(samples.len() / channels.max(1));
    downmix_to_mono_into(samples, channels, &mut mono);
    mono
}

/// [`downmix_to_mono`] into a caller-owned vector, which is cleared first.
///
/// Reuses `out`'s allocation, so it is safe to call from a device callback
/// once `out` has grown to the callback's block size.
pub fn downmix_to_mono_into(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(samples);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// RMS level of samples (0.0–1.0 for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Append a whole output frame, or nothing if it does not fit.
fn push_frame(out: &mut AudioBuffer, frame: &[f32]) -> bool {
    if out.capacity() - out.count() < frame.len() {
        return false;
    }
    out.try_extend_from_slice(frame, 0, frame.len()).is_ok()
}

fn source_range(source: &[f32], offset: usize, length: usize) -> Result<&[f32], CaptureError> {
    offset
        .checked_add(length)
        .and_then(|end| source.get(offset..end))
        .ok_or(CaptureError::InvalidSourceRange)
}
