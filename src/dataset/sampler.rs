//! Fixed-length segment sampling from variable-length recordings.

use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::config::PrepConfig;
use crate::signal::{self, DecodeError, MonoWindow};

/// Sources shorter than this are read whole instead of cropped.
pub const SHORT_SOURCE_SECONDS: f32 = 3.0;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Invalid total duration {total_duration} for {path}")]
    InvalidDuration { path: PathBuf, total_duration: f32 },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(
        "Window of {loaded_seconds:.3}s from {path} exceeds the {limit_seconds:.3}s example length"
    )]
    ExceedsDuration {
        path: PathBuf,
        loaded_seconds: f64,
        limit_seconds: f64,
    },
}

/// Fixed-length mono buffer plus the count of leading samples that carry signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Samples before this index are real audio; the rest is zero padding.
    pub valid_length: usize,
}

impl Segment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, valid_length: usize) -> Self {
        let valid_length = valid_length.min(samples.len());
        Self {
            samples,
            sample_rate,
            valid_length,
        }
    }

    pub const fn channel_count(&self) -> u16 {
        1
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `valid_length`, never past the end of `samples`.
    pub fn valid_len(&self) -> usize {
        self.valid_length.min(self.samples.len())
    }

    /// Leading samples that carry signal.
    pub fn valid_samples(&self) -> &[f32] {
        &self.samples[..self.valid_len()]
    }

    pub fn padding_len(&self) -> usize {
        self.samples.len() - self.valid_len()
    }
}

/// Source window chosen for one access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub offset_seconds: f64,
    pub duration_seconds: f64,
}

/// Crops, downmixes, resamples and pads recordings to one fixed length.
#[derive(Debug, Clone)]
pub struct SegmentSampler {
    sample_rate: u32,
    duration_seconds: f32,
    training: bool,
}

impl SegmentSampler {
    pub fn new(sample_rate: u32, duration_seconds: f32, training: bool) -> Self {
        Self {
            sample_rate,
            duration_seconds,
            training,
        }
    }

    pub fn from_config(config: &PrepConfig) -> Self {
        Self::new(config.sample_rate, config.duration_seconds, config.training)
    }

    /// Length in samples of every segment this sampler returns.
    pub fn target_len(&self) -> usize {
        (self.duration_seconds as f64 * self.sample_rate as f64).round() as usize
    }

    /// Choose the source window for a recording of `total_duration` seconds.
    ///
    /// Draws from `rng` only in training mode when the recording is at least as
    /// long as the configured duration.
    pub fn plan_window<R: Rng + ?Sized>(&self, total_duration: f32, rng: &mut R) -> Window {
        let total = total_duration as f64;
        let configured = self.duration_seconds as f64;
        let window = if total_duration < SHORT_SOURCE_SECONDS {
            total
        } else {
            configured
        };
        let offset = if total < configured || !self.training {
            0.0
        } else {
            let max_offset = (total - window).max(0.0);
            rng.random_range(0.0..=max_offset)
        };
        Window {
            offset_seconds: offset,
            duration_seconds: window,
        }
    }

    /// Load a fixed-length segment from `path`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        path: &Path,
        total_duration: f32,
        rng: &mut R,
    ) -> Result<Segment, SampleError> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(SampleError::InvalidDuration {
                path: path.to_path_buf(),
                total_duration,
            });
        }
        let window = self.plan_window(total_duration, rng);
        let loaded = signal::load_mono_window(
            path,
            window.offset_seconds,
            window.duration_seconds,
            self.sample_rate,
        )?;
        let segment = self.fit(path, loaded)?;
        tracing::trace!(
            "Sampled {} at {:.3}s for {:.3}s: {} valid of {} samples",
            path.display(),
            window.offset_seconds,
            window.duration_seconds,
            segment.valid_length,
            segment.len()
        );
        Ok(segment)
    }

    /// Pad a resampled window to the target length.
    ///
    /// A window longer than the configured duration at its source rate is an
    /// error; an overshoot introduced only by resampling is truncated.
    pub fn fit(&self, path: &Path, window: MonoWindow) -> Result<Segment, SampleError> {
        let limit_frames =
            signal::seconds_to_frames(self.duration_seconds as f64, window.source_rate);
        if window.source_frames > limit_frames {
            return Err(SampleError::ExceedsDuration {
                path: path.to_path_buf(),
                loaded_seconds: window.source_frames as f64 / window.source_rate.max(1) as f64,
                limit_seconds: self.duration_seconds as f64,
            });
        }
        let target_len = self.target_len();
        let mut samples = window.samples;
        samples.truncate(target_len);
        let valid_length = samples.len();
        samples.resize(target_len, 0.0);
        Ok(Segment::new(samples, self.sample_rate, valid_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn window(samples: usize, source_frames: usize, source_rate: u32) -> MonoWindow {
        MonoWindow {
            samples: vec![0.5; samples],
            source_frames,
            source_rate,
        }
    }

    #[test]
    fn short_recording_is_read_whole_from_start() {
        let sampler = SegmentSampler::new(16_000, 3.0, true);
        let mut rng = StdRng::seed_from_u64(3);
        let planned = sampler.plan_window(2.0, &mut rng);
        assert_eq!(planned.offset_seconds, 0.0);
        assert_eq!(planned.duration_seconds, 2.0);
    }

    #[test]
    fn long_recording_gets_random_offset_in_training() {
        let sampler = SegmentSampler::new(16_000, 3.0, true);
        let mut rng = StdRng::seed_from_u64(11);
        let offsets: Vec<f64> = (0..200)
            .map(|_| sampler.plan_window(5.0, &mut rng))
            .inspect(|w| assert_eq!(w.duration_seconds, 3.0))
            .map(|w| w.offset_seconds)
            .collect();
        assert!(offsets.iter().all(|o| (0.0..=2.0).contains(o)));
        assert!(offsets.iter().any(|o| *o > 1.0));
        assert!(offsets.iter().any(|o| *o < 1.0));
    }

    #[test]
    fn evaluation_always_starts_at_zero() {
        let sampler = SegmentSampler::new(16_000, 3.0, false);
        let mut rng = StdRng::seed_from_u64(5);
        for total in [3.0, 5.0, 60.0] {
            assert_eq!(sampler.plan_window(total, &mut rng).offset_seconds, 0.0);
        }
    }

    #[test]
    fn recording_between_configured_and_short_threshold_never_goes_negative() {
        // Configured 2s, source 2.5s: the window is the whole source.
        let sampler = SegmentSampler::new(16_000, 2.0, true);
        let mut rng = StdRng::seed_from_u64(9);
        let planned = sampler.plan_window(2.5, &mut rng);
        assert_eq!(planned.offset_seconds, 0.0);
        assert_eq!(planned.duration_seconds, 2.5);
    }

    #[test]
    fn fit_pads_short_window_and_reports_valid_length() {
        let sampler = SegmentSampler::new(16_000, 3.0, true);
        let segment = sampler
            .fit(Path::new("a.wav"), window(32_000, 88_200, 44_100))
            .unwrap();
        assert_eq!(segment.len(), 48_000);
        assert_eq!(segment.valid_length, 32_000);
        assert_eq!(segment.padding_len(), 16_000);
        assert!(segment.samples[32_000..].iter().all(|s| *s == 0.0));
        assert_eq!(segment.channel_count(), 1);
    }

    #[test]
    fn fit_truncates_resampling_overshoot() {
        let sampler = SegmentSampler::new(16_000, 3.0, true);
        let segment = sampler
            .fit(Path::new("a.wav"), window(48_001, 132_300, 44_100))
            .unwrap();
        assert_eq!(segment.len(), 48_000);
        assert_eq!(segment.valid_length, 48_000);
    }

    #[test]
    fn fit_rejects_windows_longer_than_configured() {
        let sampler = SegmentSampler::new(16_000, 2.0, true);
        let err = sampler
            .fit(Path::new("a.wav"), window(40_000, 40_000, 16_000))
            .unwrap_err();
        assert!(matches!(err, SampleError::ExceedsDuration { .. }));
    }

    #[test]
    fn overstated_valid_length_is_clamped_by_accessors() {
        let segment = Segment {
            samples: vec![0.5; 4],
            sample_rate: 16_000,
            valid_length: 9,
        };
        assert_eq!(segment.valid_len(), 4);
        assert_eq!(segment.valid_samples().len(), 4);
        assert_eq!(segment.padding_len(), 0);
        assert_eq!(Segment::new(vec![0.5; 4], 16_000, 9).valid_length, 4);
    }

    #[test]
    fn non_positive_duration_is_rejected_before_decoding() {
        let sampler = SegmentSampler::new(16_000, 3.0, true);
        let mut rng = StdRng::seed_from_u64(1);
        for total in [0.0, -1.0, f32::NAN] {
            let err = sampler
                .sample(Path::new("missing.wav"), total, &mut rng)
                .unwrap_err();
            assert!(matches!(err, SampleError::InvalidDuration { .. }));
        }
    }
}
