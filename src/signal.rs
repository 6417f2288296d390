//! Audio decoding, channel downmix, resampling and loudness helpers.

mod decode;
mod loudness;
mod resample;

use std::path::Path;

pub use decode::{DecodeError, DecodedAudio, decode_window};
pub use loudness::{
    EPS, TARGET_RMS_DB, db_to_linear, normalize_loudness, normalize_loudness_in_place, peak, rms,
};
pub use resample::{resample_linear, resample_linear_into, resampled_len};

pub(crate) use decode::seconds_to_frames;

/// Mono window resampled to the requested rate.
#[derive(Debug, Clone)]
pub struct MonoWindow {
    pub samples: Vec<f32>,
    /// Frames decoded at the source rate, before resampling.
    pub source_frames: usize,
    pub source_rate: u32,
}

/// Decode a window, downmix it to mono and resample it to `sample_rate`.
pub fn load_mono_window(
    path: &Path,
    offset_seconds: f64,
    duration_seconds: f64,
    sample_rate: u32,
) -> Result<MonoWindow, DecodeError> {
    let decoded = decode_window(path, offset_seconds, duration_seconds)?;
    let source_frames = decoded.frames();
    let mono = downmix_to_mono(&decoded.samples, decoded.channels);
    let samples = resample_linear(&mono, decoded.sample_rate, sample_rate);
    Ok(MonoWindow {
        samples,
        source_frames,
        source_rate: decoded.sample_rate,
    })
}

/// Average interleaved channels into one; non-finite samples become silence.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.iter().copied().map(sanitize_sample).collect();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().copied().map(sanitize_sample).sum::<f32>() / channels as f32)
        .collect()
}

fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}
