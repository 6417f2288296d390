//! Materialize a prepared dataset as fixed-length WAV files plus an index.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clipprep::dataset::{AudioDataset, mix_seed};
use clipprep::{PrepConfig, app_dirs, config, logging};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct ExportOptions {
    manifest: PathBuf,
    out_dir: PathBuf,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    limit: Option<usize>,
    eval: bool,
}

#[derive(Serialize)]
struct ExportedExample<'a> {
    index: usize,
    file: &'a str,
    caption: &'a str,
    valid_length: usize,
    sample_rate: u32,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let _run_log = match logging::init(&options.out_dir) {
        Ok(run_log) => {
            tracing::debug!("Run log at {}", run_log.path().display());
            Some(run_log)
        }
        Err(err) => {
            eprintln!("Logging disabled: {err}");
            None
        }
    };
    export(&options).inspect_err(|err| tracing::error!("{err}"))
}

fn export(options: &ExportOptions) -> Result<(), String> {
    let config = load_config(options)?;
    let seed = options.seed.or(config.seed).unwrap_or_else(rand::random);
    let dataset = AudioDataset::open(&options.manifest, config).map_err(|err| err.to_string())?;
    let count = options.limit.unwrap_or(usize::MAX).min(dataset.len());
    tracing::info!(
        "Exporting {count} of {} examples from {} (seed {seed})",
        dataset.len(),
        options.manifest.display()
    );

    std::fs::create_dir_all(&options.out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", options.out_dir.display()))?;
    let index_path = options.out_dir.join("examples.jsonl");
    let index_file = File::create(&index_path)
        .map_err(|err| format!("Failed to create {}: {err}", index_path.display()))?;
    let mut index = BufWriter::new(index_file);

    let sample_rate = dataset.config().sample_rate;
    for idx in 0..count {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, idx as u64));
        let example = dataset.get(idx, &mut rng).map_err(|err| err.to_string())?;
        let file_name = format!("{idx:06}.wav");
        write_wav(
            &options.out_dir.join(&file_name),
            &example.waveform.samples,
            sample_rate,
        )?;
        tracing::debug!(
            "Example {idx}: valid {} of {} samples, caption {:?}",
            example.valid_length(),
            example.waveform.len(),
            example.caption
        );
        let line = serde_json::to_string(&ExportedExample {
            index: idx,
            file: &file_name,
            caption: &example.caption,
            valid_length: example.valid_length(),
            sample_rate,
        })
        .map_err(|err| format!("Failed to serialize example {idx}: {err}"))?;
        writeln!(index, "{line}").map_err(|err| format!("Failed to write index: {err}"))?;
    }
    index
        .flush()
        .map_err(|err| format!("Failed to write index: {err}"))?;
    tracing::info!("Wrote {count} rows to {}", index_path.display());
    println!("Exported {count} examples into {}", options.out_dir.display());
    Ok(())
}

/// A `--config` path must exist; only the implicit location falls back to defaults.
fn load_config(options: &ExportOptions) -> Result<PrepConfig, String> {
    let config = match &options.config_path {
        Some(path) => config::load(path),
        None => {
            let path = app_dirs::default_config_path().map_err(|err| err.to_string())?;
            config::load_or_default(&path)
        }
    }
    .map_err(|err| err.to_string())?;
    Ok(if options.eval {
        config.for_evaluation()
    } else {
        config
    })
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), String> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let file = File::create(path)
        .map_err(|err| format!("Failed to create {}: {err}", path.display()))?;
    let mut writer = hound::WavWriter::new(BufWriter::with_capacity(1024 * 1024, file), spec)
        .map_err(|err| format!("Failed to write wav: {err}"))?;
    for sample in samples {
        writer
            .write_sample(*sample)
            .map_err(|err| format!("Failed to write sample: {err}"))?;
    }
    writer
        .finalize()
        .map_err(|err| format!("Failed to finalize wav: {err}"))
}

fn parse_args(args: Vec<String>) -> Result<Option<ExportOptions>, String> {
    let mut options = ExportOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--manifest" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--manifest requires a value".to_string())?;
                options.manifest = PathBuf::from(value);
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out_dir = PathBuf::from(value);
            }
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--limit" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--limit requires a value".to_string())?;
                options.limit = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --limit value: {value}"))?,
                );
            }
            "--eval" => options.eval = true,
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    if options.manifest.as_os_str().is_empty() {
        return Err("--manifest is required".to_string());
    }
    if options.out_dir.as_os_str().is_empty() {
        return Err("--out is required".to_string());
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "clipprep-export",
        "",
        "Writes fixed-length training examples, an examples.jsonl index and a run log.",
        "",
        "Usage:",
        "  clipprep-export --manifest <rows.jsonl> --out <dir> [options]",
        "",
        "Options:",
        "  --config <path>   Preparation config; must exist (default: <config home>/.clipprep/config.toml if present)",
        "  --seed <u64>      Base seed; each example derives its own stream from it",
        "  --limit <n>       Export at most n rows",
        "  --eval            Fixed crop offsets, no composition or duration tags",
    ]
    .join("\n")
}
