use ndarray::{Array2, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::{AudioDataset, CompositeExample, DatasetError};

/// Examples stacked for the encoder.
#[derive(Debug, Clone)]
pub struct Batch {
    /// `[batch, samples]` waveforms, all of the dataset's target length.
    pub waveforms: Array2<f32>,
    pub captions: Vec<String>,
    /// Pre-padding sample counts, one per row.
    pub valid_lengths: Vec<usize>,
    pub sample_rate: u32,
}

impl Batch {
    /// Stack examples that share `len` and `sample_rate`.
    pub fn from_examples(
        examples: Vec<CompositeExample>,
        len: usize,
        sample_rate: u32,
    ) -> Result<Self, DatasetError> {
        let rows = examples.len();
        let mut flat = Vec::with_capacity(rows * len);
        let mut captions = Vec::with_capacity(rows);
        let mut valid_lengths = Vec::with_capacity(rows);
        for example in examples {
            let (samples, caption, valid_length) = example.into_parts();
            flat.extend(samples);
            captions.push(caption);
            valid_lengths.push(valid_length);
        }
        let waveforms = Array2::from_shape_vec((rows, len), flat)?;
        Ok(Self {
            waveforms,
            captions,
            valid_lengths,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn waveforms(&self) -> ArrayView2<'_, f32> {
        self.waveforms.view()
    }
}

impl AudioDataset {
    /// Load `indices` in parallel and stack them.
    ///
    /// Position `i` of the batch draws from its own generator seeded with
    /// `mix_seed(seed, i)`, so the result does not depend on thread scheduling.
    /// The first failing access aborts the batch.
    pub fn collate(&self, indices: &[usize], seed: u64) -> Result<Batch, DatasetError> {
        let examples = indices
            .par_iter()
            .enumerate()
            .map(|(position, &index)| {
                let mut rng = StdRng::seed_from_u64(mix_seed(seed, position as u64));
                self.get(index, &mut rng)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Batch::from_examples(examples, self.target_len(), self.config().sample_rate)
    }
}

/// Derive an independent stream seed (SplitMix64 finalizer).
pub fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
