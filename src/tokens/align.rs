use ndarray::s;
use thiserror::Error;

use super::{Encoder, SpecialTokens, TokenGrid};
use crate::dataset::Batch;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Got {lengths} valid lengths for a batch of {batch}")]
    LengthCountMismatch { lengths: usize, batch: usize },
    #[error("Invalid rates: sample rate {sample_rate}, frame rate {frame_rate}")]
    InvalidRate { sample_rate: u32, frame_rate: f32 },
}

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("Encoder failed: {0}")]
    Encode(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Encoder returned {got} rows for a batch of {expected}")]
    BatchSize { got: usize, expected: usize },
    #[error(transparent)]
    Align(#[from] AlignError),
}

/// Tokens covering `valid_length` samples: `floor(valid_length / sample_rate * frame_rate)`.
pub fn valid_token_count(valid_length: usize, sample_rate: u32, frame_rate: f32) -> usize {
    let seconds = valid_length as f64 / sample_rate as f64;
    (seconds * frame_rate as f64).floor() as usize
}

/// Overwrite every position from each row's valid token count onward with
/// `pad_id` and clear its mask, across all codebooks.
///
/// Earlier positions are left untouched. A valid count past the end of the
/// grid leaves the row as it is.
pub fn align_tokens(
    grid: &mut TokenGrid,
    valid_lengths: &[usize],
    sample_rate: u32,
    frame_rate: f32,
    pad_id: i64,
) -> Result<(), AlignError> {
    if sample_rate == 0 || !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(AlignError::InvalidRate {
            sample_rate,
            frame_rate,
        });
    }
    if valid_lengths.len() != grid.batch() {
        return Err(AlignError::LengthCountMismatch {
            lengths: valid_lengths.len(),
            batch: grid.batch(),
        });
    }
    let timesteps = grid.timesteps();
    for (row, &valid_length) in valid_lengths.iter().enumerate() {
        let valid_tokens = valid_token_count(valid_length, sample_rate, frame_rate).min(timesteps);
        grid.codes.slice_mut(s![row, .., valid_tokens..]).fill(pad_id);
        grid.padding_mask
            .slice_mut(s![row, .., valid_tokens..])
            .fill(false);
    }
    Ok(())
}

/// Encodes batches and masks their padding with the injected ports.
pub struct TokenAligner<'a, E, S> {
    encoder: &'a E,
    special_tokens: &'a S,
}

impl<'a, E: Encoder, S: SpecialTokens> TokenAligner<'a, E, S> {
    pub fn new(encoder: &'a E, special_tokens: &'a S) -> Self {
        Self {
            encoder,
            special_tokens,
        }
    }

    /// Mask an already encoded grid.
    pub fn align(
        &self,
        grid: &mut TokenGrid,
        valid_lengths: &[usize],
        sample_rate: u32,
    ) -> Result<(), AlignError> {
        align_tokens(
            grid,
            valid_lengths,
            sample_rate,
            self.encoder.frame_rate(),
            self.special_tokens.pad_id(),
        )
    }

    /// Encode a batch and mask the padding of every row.
    pub fn tokenize(&self, batch: &Batch) -> Result<TokenGrid, TokenizeError> {
        let encoded = self
            .encoder
            .encode(batch.waveforms())
            .map_err(|err| TokenizeError::Encode(Box::new(err)))?;
        let mut grid = TokenGrid::new(encoded.codes);
        if grid.batch() != batch.len() {
            return Err(TokenizeError::BatchSize {
                got: grid.batch(),
                expected: batch.len(),
            });
        }
        self.align(&mut grid, &batch.valid_lengths, batch.sample_rate)?;
        Ok(grid)
    }
}
