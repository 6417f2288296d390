use std::path::Path;

use super::records::{RecordLoadError, read_rows};

/// Number of prompts kept for generation-only evaluation.
pub const DEFAULT_PROMPT_LIMIT: usize = 15;

/// Caption-only view of a manifest, used to drive sample generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptSet {
    captions: Vec<String>,
}

impl PromptSet {
    /// Read the first `limit` captions of a manifest.
    pub fn open(manifest: &Path, limit: usize) -> Result<Self, RecordLoadError> {
        let captions = read_rows(manifest)?
            .into_iter()
            .take(limit)
            .map(|row| row.caption)
            .collect();
        Ok(Self { captions })
    }

    pub fn from_captions(captions: Vec<String>) -> Self {
        Self { captions }
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.captions.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.captions.iter().map(String::as_str)
    }
}
