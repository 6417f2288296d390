//! Two-clip composition: additive mix or sequential concatenation.

use rand::Rng;
use thiserror::Error;

use super::caption::CaptionPolicy;
use super::records::{CompositionMode, Record};
use super::sampler::{SampleError, Segment, SegmentSampler};
use crate::signal::normalize_loudness;

/// Source window requested for a secondary clip that is mixed in.
pub const MIX_WINDOW_SECONDS: f32 = 3.0;
/// Source window requested for a secondary clip that is appended.
pub const CONCAT_WINDOW_SECONDS: f32 = 1.5;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Failed to sample secondary clip: {0}")]
    Secondary(#[from] SampleError),
    #[error(
        "Concatenated clips need {primary} + {secondary} samples but the example holds {capacity}"
    )]
    ConcatOverflow {
        primary: usize,
        secondary: usize,
        capacity: usize,
    },
    #[error("Cannot mix segments of {primary} and {secondary} samples")]
    LengthMismatch { primary: usize, secondary: usize },
}

/// Waveform and caption after composition, before caption dropout.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub waveform: Segment,
    pub caption: String,
}

/// Combines a primary segment with the record's secondary clip, if any.
pub struct ClipComposer<'a> {
    sampler: &'a SegmentSampler,
    captions: &'a CaptionPolicy,
}

impl<'a> ClipComposer<'a> {
    pub fn new(sampler: &'a SegmentSampler, captions: &'a CaptionPolicy) -> Self {
        Self { sampler, captions }
    }

    /// Rows without a secondary clip keep their waveform and go through
    /// duration tagging instead.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        primary: Segment,
        record: &Record,
        rng: &mut R,
    ) -> Result<Composition, ComposeError> {
        let Some(secondary) = &record.secondary else {
            let caption =
                self.captions
                    .tag_duration(record.caption.clone(), record.total_duration, rng);
            return Ok(Composition {
                waveform: primary,
                caption,
            });
        };

        let waveform = match secondary.mode {
            CompositionMode::Mix => {
                let other = self
                    .sampler
                    .sample(&secondary.path, MIX_WINDOW_SECONDS, rng)?;
                mix_segments(&primary, &other)?
            }
            CompositionMode::Concat => {
                let other = self
                    .sampler
                    .sample(&secondary.path, CONCAT_WINDOW_SECONDS, rng)?;
                concat_segments(&primary, &other, self.sampler.target_len())?
            }
        };
        tracing::debug!(
            "Composed {:?} of {} and {}: valid length {}",
            secondary.mode,
            record.audio_path.display(),
            secondary.path.display(),
            waveform.valid_length
        );
        Ok(Composition {
            waveform,
            caption: secondary.combined_caption.clone(),
        })
    }
}

/// Loudness-normalize both full segments and sum them without rescaling.
pub fn mix_segments(primary: &Segment, secondary: &Segment) -> Result<Segment, ComposeError> {
    if primary.len() != secondary.len() {
        return Err(ComposeError::LengthMismatch {
            primary: primary.len(),
            secondary: secondary.len(),
        });
    }
    let mut mixed = normalize_loudness(&primary.samples);
    for (out, other) in mixed.iter_mut().zip(normalize_loudness(&secondary.samples)) {
        *out += other;
    }
    let valid_length = primary.valid_len().max(secondary.valid_len());
    Ok(Segment::new(mixed, primary.sample_rate, valid_length))
}

/// Place the valid parts of both segments back to back, then zero-pad to
/// `total_len`.
///
/// The returned valid length is `max(primary, secondary)`, not their sum, so it
/// undercounts the real audio in the result. Callers aligning tokens against it
/// will mask part of the secondary clip.
pub fn concat_segments(
    primary: &Segment,
    secondary: &Segment,
    total_len: usize,
) -> Result<Segment, ComposeError> {
    let primary_len = primary.valid_len();
    let secondary_len = secondary.valid_len();
    if primary_len + secondary_len > total_len {
        return Err(ComposeError::ConcatOverflow {
            primary: primary_len,
            secondary: secondary_len,
            capacity: total_len,
        });
    }
    let mut joined = Vec::with_capacity(total_len);
    joined.extend(normalize_loudness(primary.valid_samples()));
    joined.extend(normalize_loudness(secondary.valid_samples()));
    joined.resize(total_len, 0.0);
    let valid_length = primary_len.max(secondary_len);
    Ok(Segment::new(joined, primary.sample_rate, valid_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{TARGET_RMS_DB, db_to_linear, rms};

    fn tone(len: usize, valid: usize, amplitude: f32) -> Segment {
        let mut samples: Vec<f32> = (0..valid)
            .map(|i| amplitude * (i as f32 * 0.07).sin())
            .collect();
        samples.resize(len, 0.0);
        Segment::new(samples, 16_000, valid)
    }

    #[test]
    fn mix_keeps_length_and_takes_longer_valid_length() {
        let primary = tone(48_000, 20_000, 0.2);
        let secondary = tone(48_000, 48_000, 0.9);
        let mixed = mix_segments(&primary, &secondary).unwrap();
        assert_eq!(mixed.len(), 48_000);
        assert_eq!(mixed.valid_length, 48_000);

        let swapped = mix_segments(&secondary, &primary).unwrap();
        assert_eq!(swapped.valid_length, 48_000);
    }

    #[test]
    fn mix_is_sum_of_independently_normalized_segments() {
        let primary = tone(8_000, 8_000, 0.2);
        let secondary = tone(8_000, 4_000, 0.7);
        let mixed = mix_segments(&primary, &secondary).unwrap();
        let a = normalize_loudness(&primary.samples);
        let b = normalize_loudness(&secondary.samples);
        for i in [0, 17, 3_999, 4_000, 7_999] {
            assert!((mixed.samples[i] - (a[i] + b[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn mix_rejects_mismatched_lengths() {
        let err = mix_segments(&tone(100, 100, 0.5), &tone(99, 99, 0.5)).unwrap_err();
        assert!(matches!(err, ComposeError::LengthMismatch { .. }));
    }

    #[test]
    fn concat_places_clips_back_to_back_with_exact_trailing_zeros() {
        let primary = tone(48_000, 20_000, 0.3);
        let secondary = tone(48_000, 24_000, 0.6);
        let joined = concat_segments(&primary, &secondary, 48_000).unwrap();
        assert_eq!(joined.len(), 48_000);

        let trailing_zeros = joined.samples.iter().rev().take_while(|s| **s == 0.0).count();
        assert_eq!(trailing_zeros, 48_000 - 20_000 - 24_000);

        let target = db_to_linear(TARGET_RMS_DB);
        assert!((rms(&joined.samples[..20_000]) - target).abs() < 1e-4);
        assert!((rms(&joined.samples[20_000..44_000]) - target).abs() < 1e-4);
    }

    #[test]
    fn concat_valid_length_is_max_not_sum() {
        // Open question: concatenation reports max(primary, secondary) even
        // though primary + secondary samples carry signal.
        let primary = tone(48_000, 20_000, 0.3);
        let secondary = tone(48_000, 24_000, 0.6);
        let joined = concat_segments(&primary, &secondary, 48_000).unwrap();
        assert_eq!(joined.valid_length, 24_000);
        assert_ne!(joined.valid_length, 44_000);
    }

    #[test]
    fn concat_exactly_filling_the_example_has_no_padding() {
        let primary = tone(48_000, 24_000, 0.3);
        let secondary = tone(48_000, 24_000, 0.6);
        let joined = concat_segments(&primary, &secondary, 48_000).unwrap();
        assert_eq!(joined.len(), 48_000);
        assert_ne!(joined.samples[47_999], 0.0);
    }

    #[test]
    fn segments_built_by_hand_are_composed_with_clamped_valid_lengths() {
        let overstated = Segment {
            samples: vec![0.2; 1_000],
            sample_rate: 16_000,
            valid_length: 5_000,
        };
        let short = tone(1_000, 300, 0.5);

        let mixed = mix_segments(&overstated, &short).unwrap();
        assert_eq!(mixed.valid_length, 1_000);

        match concat_segments(&overstated, &short, 1_000) {
            Err(ComposeError::ConcatOverflow { primary, .. }) => assert_eq!(primary, 1_000),
            other => panic!("unexpected result: {other:?}"),
        }
        let joined = concat_segments(&short, &overstated, 2_000).unwrap();
        assert_eq!(joined.len(), 2_000);
        assert_eq!(joined.padding_len(), 1_000);
        assert_eq!(
            joined.samples.iter().rev().take_while(|s| **s == 0.0).count(),
            700
        );
    }

    #[test]
    fn concat_overflow_is_an_error() {
        let primary = tone(48_000, 48_000, 0.3);
        let secondary = tone(48_000, 24_000, 0.6);
        match concat_segments(&primary, &secondary, 48_000) {
            Err(ComposeError::ConcatOverflow {
                primary,
                secondary,
                capacity,
            }) => {
                assert_eq!((primary, secondary, capacity), (48_000, 24_000, 48_000));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
