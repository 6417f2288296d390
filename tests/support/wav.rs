use std::path::{Path, PathBuf};

/// Write a mono 32-bit float WAV.
pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    write_interleaved_wav(path, samples, sample_rate, 1);
}

/// Write interleaved 32-bit float samples with `channels` channels.
pub fn write_interleaved_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        writer.write_sample(sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Mono sine of `seconds` at `sample_rate`, written to `dir/name`.
pub fn write_tone(dir: &Path, name: &str, seconds: f32, sample_rate: u32) -> PathBuf {
    let frames = (seconds * sample_rate as f32).round() as usize;
    let samples: Vec<f32> = (0..frames)
        .map(|i| 0.4 * (i as f32 * 440.0 * std::f32::consts::TAU / sample_rate as f32).sin())
        .collect();
    let path = dir.join(name);
    write_test_wav(&path, &samples, sample_rate);
    path
}
