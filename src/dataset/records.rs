//! Record table loaded from a JSONL manifest.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordLoadError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid manifest row at {path}:{line}: {source}")]
    Row {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

/// How a secondary recording is combined with the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionMode {
    /// Additive overlay of two equally long segments.
    Mix,
    /// Primary clip followed by the secondary clip, then silence.
    Concat,
}

impl CompositionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "mix" => Some(Self::Mix),
            "concat" => Some(Self::Concat),
            _ => None,
        }
    }
}

/// Secondary recording with everything needed to compose it.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryClip {
    pub path: PathBuf,
    pub mode: CompositionMode,
    /// Caption describing the composed example.
    pub combined_caption: String,
}

/// One immutable dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub audio_path: PathBuf,
    /// Length of the whole source recording, in seconds.
    pub total_duration: f32,
    pub caption: String,
    /// Present only when path, mode and combined caption are all valid.
    pub secondary: Option<SecondaryClip>,
}

/// Raw manifest row as written by the captioning tooling.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRow {
    pub audio_path: PathBuf,
    pub duration: f32,
    pub caption: String,
    #[serde(default)]
    pub added_audio_path: Option<String>,
    #[serde(default)]
    pub typed: Option<String>,
    #[serde(default)]
    pub mixed_caption: Option<String>,
}

impl Record {
    /// Build a record, resolving relative paths against `base_dir`.
    ///
    /// Incomplete composition columns leave `secondary` empty instead of
    /// failing the row.
    pub fn from_row(row: RecordRow, base_dir: &Path) -> Self {
        let secondary = secondary_from_row(&row, base_dir);
        Self {
            audio_path: resolve(base_dir, &row.audio_path),
            total_duration: row.duration,
            caption: row.caption,
            secondary,
        }
    }

    /// Record without a secondary clip.
    pub fn single(audio_path: impl Into<PathBuf>, total_duration: f32, caption: &str) -> Self {
        Self {
            audio_path: audio_path.into(),
            total_duration,
            caption: caption.to_string(),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: SecondaryClip) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

fn secondary_from_row(row: &RecordRow, base_dir: &Path) -> Option<SecondaryClip> {
    let path = non_empty(row.added_audio_path.as_deref())?;
    let mode = non_empty(row.typed.as_deref()).and_then(CompositionMode::parse);
    let caption = non_empty(row.mixed_caption.as_deref());
    match (mode, caption) {
        (Some(mode), Some(caption)) => Some(SecondaryClip {
            path: resolve(base_dir, Path::new(path)),
            mode,
            combined_caption: caption.to_string(),
        }),
        _ => {
            tracing::debug!(
                "Ignoring secondary clip {path} for {}: typed={:?} mixed_caption present={}",
                row.audio_path.display(),
                row.typed,
                caption.is_some()
            );
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Load every row of a JSONL manifest. Blank lines are skipped.
pub fn load_records(path: &Path) -> Result<Vec<Record>, RecordLoadError> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    let records: Vec<Record> = read_rows(path)?
        .into_iter()
        .map(|row| Record::from_row(row, &base_dir))
        .collect();
    tracing::info!(
        "Loaded {} records ({} with a secondary clip) from {}",
        records.len(),
        records.iter().filter(|r| r.secondary.is_some()).count(),
        path.display()
    );
    Ok(records)
}

/// Parse manifest rows without interpreting them.
pub fn read_rows(path: &Path) -> Result<Vec<RecordRow>, RecordLoadError> {
    let io_err = |source| RecordLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| RecordLoadError::Row {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_rows_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("train.jsonl");
        std::fs::write(
            &manifest,
            r#"{"audio_path":"a.wav","duration":2.0,"caption":"dog barking"}

{"audio_path":"/abs/b.wav","duration":5.5,"caption":"rain","added_audio_path":"c.wav","typed":"mix","mixed_caption":"rain and thunder"}
{"audio_path":"d.wav","duration":1.0,"caption":"bell","added_audio_path":"e.wav","typed":"concat","mixed_caption":"bell then knock"}
"#,
        )
        .unwrap();

        let records = load_records(&manifest).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].audio_path, dir.path().join("a.wav"));
        assert_eq!(records[0].secondary, None);
        assert_eq!(records[1].audio_path, PathBuf::from("/abs/b.wav"));
        let mix = records[1].secondary.as_ref().unwrap();
        assert_eq!(mix.mode, CompositionMode::Mix);
        assert_eq!(mix.path, dir.path().join("c.wav"));
        assert_eq!(mix.combined_caption, "rain and thunder");
        assert_eq!(
            records[2].secondary.as_ref().unwrap().mode,
            CompositionMode::Concat
        );
    }

    #[test]
    fn null_empty_or_partial_secondary_columns_fall_back_to_single() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("rows.jsonl");
        std::fs::write(
            &manifest,
            r#"{"audio_path":"a.wav","duration":2.0,"caption":"a","added_audio_path":null,"typed":"mix","mixed_caption":"x"}
{"audio_path":"b.wav","duration":2.0,"caption":"b","added_audio_path":"","typed":"mix","mixed_caption":"x"}
{"audio_path":"c.wav","duration":2.0,"caption":"c","added_audio_path":"z.wav","typed":"blend","mixed_caption":"x"}
{"audio_path":"d.wav","duration":2.0,"caption":"d","added_audio_path":"z.wav","typed":"mix"}
"#,
        )
        .unwrap();

        let records = load_records(&manifest).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|record| record.secondary.is_none()));
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("bad.jsonl");
        std::fs::write(
            &manifest,
            "{\"audio_path\":\"a.wav\",\"duration\":1.0,\"caption\":\"a\"}\n{\"audio_path\":\"b.wav\"}\n",
        )
        .unwrap();

        match load_records(&manifest) {
            Err(RecordLoadError::Row { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
