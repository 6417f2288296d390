//! Dataset access: one fixed-length, captioned example per manifest row.

mod batch;
mod caption;
mod compose;
mod prompts;
mod records;
mod sampler;

use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::config::{ConfigError, PrepConfig};

pub use batch::{Batch, mix_seed};
pub use caption::{CaptionPolicy, SHORT_TAG, TRIMMED_TAG};
pub use compose::{
    CONCAT_WINDOW_SECONDS, ClipComposer, ComposeError, Composition, MIX_WINDOW_SECONDS,
    concat_segments, mix_segments,
};
pub use prompts::{DEFAULT_PROMPT_LIMIT, PromptSet};
pub use records::{
    CompositionMode, Record, RecordLoadError, RecordRow, SecondaryClip, load_records, read_rows,
};
pub use sampler::{SHORT_SOURCE_SECONDS, SampleError, Segment, SegmentSampler, Window};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Records(#[from] RecordLoadError),
    #[error("Index {index} out of range for dataset of {len} records")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Record {index} ({path}): {source}")]
    Sample {
        index: usize,
        path: PathBuf,
        source: SampleError,
    },
    #[error("Record {index} ({path}): {source}")]
    Compose {
        index: usize,
        path: PathBuf,
        source: ComposeError,
    },
    #[error("Failed to stack batch waveforms: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Unit returned by one dataset access.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeExample {
    /// Fixed-length waveform; its `valid_length` is the example's.
    pub waveform: Segment,
    pub caption: String,
}

impl CompositeExample {
    pub fn valid_length(&self) -> usize {
        self.waveform.valid_len()
    }

    /// Split into `(waveform, caption, valid_length)`.
    pub fn into_parts(self) -> (Vec<f32>, String, usize) {
        let valid_length = self.waveform.valid_len();
        (self.waveform.samples, self.caption, valid_length)
    }
}

/// Immutable record list plus the settings used to turn rows into examples.
#[derive(Debug, Clone)]
pub struct AudioDataset {
    records: Vec<Record>,
    config: PrepConfig,
    sampler: SegmentSampler,
}

impl AudioDataset {
    /// Load records from a JSONL manifest.
    pub fn open(manifest: &Path, config: PrepConfig) -> Result<Self, DatasetError> {
        let records = load_records(manifest)?;
        Self::new(records, config)
    }

    pub fn new(records: Vec<Record>, config: PrepConfig) -> Result<Self, DatasetError> {
        config.validate()?;
        let sampler = SegmentSampler::from_config(&config);
        Ok(Self {
            records,
            config,
            sampler,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Length in samples of every returned waveform.
    pub fn target_len(&self) -> usize {
        self.sampler.target_len()
    }

    /// Build the example for `index`.
    ///
    /// Draw order: primary crop offset, secondary crop offset or duration-tag
    /// gate, then caption dropout. Dropout always runs last so it also applies
    /// to composed and tagged captions.
    pub fn get<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<CompositeExample, DatasetError> {
        let record = self
            .records
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.records.len(),
            })?;
        let primary = self
            .sampler
            .sample(&record.audio_path, record.total_duration, rng)
            .map_err(|source| DatasetError::Sample {
                index,
                path: record.audio_path.clone(),
                source,
            })?;

        let composed = if self.config.mixed {
            ClipComposer::new(&self.sampler, &self.config.caption)
                .compose(primary, record, rng)
                .map_err(|source| DatasetError::Compose {
                    index,
                    path: record.audio_path.clone(),
                    source,
                })?
        } else {
            Composition {
                waveform: primary,
                caption: record.caption.clone(),
            }
        };

        let caption = self.config.caption.apply_dropout(composed.caption, rng);
        Ok(CompositeExample {
            waveform: composed.waveform,
            caption,
        })
    }
}
