//! Training-example preparation for text-to-audio finetuning.
//!
//! Rows of a caption manifest become fixed-length, loudness-normalized mono
//! waveforms with a caption and a valid (pre-padding) sample count. After an
//! external encoder has turned a batch into tokens, [`tokens::align_tokens`]
//! masks every token that only covers padding.

/// Application directory helpers.
pub mod app_dirs;
/// Preparation settings.
pub mod config;
/// Dataset access, composition and caption augmentation.
pub mod dataset;
/// Tracing setup for the command-line tools.
pub mod logging;
/// Decoding, resampling and loudness normalization.
pub mod signal;
/// Encoder ports and token padding alignment.
pub mod tokens;

pub use config::PrepConfig;
pub use dataset::{AudioDataset, Batch, CompositeExample, DatasetError, PromptSet, Record, Segment};
pub use tokens::{Encoder, SpecialTokens, TokenAligner, TokenGrid};
