//! Token grids produced by the external audio encoder, and padding alignment.
//!
//! The encoder and the language model's special-token table are owned by the
//! training process. They reach this crate only through the [`Encoder`] and
//! [`SpecialTokens`] ports.

mod align;

use ndarray::{Array1, Array3, ArrayView2};

pub use align::{AlignError, TokenAligner, TokenizeError, align_tokens, valid_token_count};

/// Output of one [`Encoder::encode`] call.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    /// `[batch, codebooks, timesteps]` token ids.
    pub codes: Array3<i64>,
    /// Per-row scale, for encoders that normalize their input.
    pub scale: Option<Array1<f32>>,
}

/// Compression model that turns waveforms into discrete tokens.
pub trait Encoder {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Encode `[batch, samples]` waveforms.
    fn encode(&self, waveforms: ArrayView2<'_, f32>) -> Result<EncodedBatch, Self::Error>;

    /// Tokens produced per second of audio.
    fn frame_rate(&self) -> f32;
}

/// Reserved token ids of the downstream language model.
pub trait SpecialTokens {
    /// Id written over every padding position.
    fn pad_id(&self) -> i64;
}

/// Token ids plus a per-position mask of real content.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrid {
    /// `[batch, codebooks, timesteps]` token ids.
    pub codes: Array3<i64>,
    /// `true` where the position carries real content.
    pub padding_mask: Array3<bool>,
}

impl TokenGrid {
    /// Wrap encoder output with an all-`true` mask.
    pub fn new(codes: Array3<i64>) -> Self {
        let padding_mask = Array3::from_elem(codes.dim(), true);
        Self {
            codes,
            padding_mask,
        }
    }

    pub fn batch(&self) -> usize {
        self.codes.dim().0
    }

    pub fn codebooks(&self) -> usize {
        self.codes.dim().1
    }

    pub fn timesteps(&self) -> usize {
        self.codes.dim().2
    }
}
