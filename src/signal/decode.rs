use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::SampleFormat;
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use thiserror::Error;

/// Raw decoded audio window in interleaved `f32` samples.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Number of frames (samples per channel) in the window.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Errors raised while decoding an audio window.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("WAV decode failed for {path}: {source}")]
    Wav {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Symphonia decode failed for {path}: {source}")]
    Symphonia {
        path: PathBuf,
        source: SymphoniaError,
    },
    #[error("No default track for {0}")]
    NoTrack(PathBuf),
    #[error("Missing {what} for {path}")]
    MissingParameter { path: PathBuf, what: &'static str },
    #[error("Window at {offset_seconds:.3}s decoded 0 samples for {path}")]
    Empty { path: PathBuf, offset_seconds: f64 },
}

/// Decode `[offset_seconds, offset_seconds + duration_seconds)` of a file.
///
/// WAV files are read with `hound` and seek straight to the offset; every
/// other container goes through `symphonia`, which decodes from the start and
/// discards the frames before the offset. A window running past the end of the
/// file is returned short.
pub fn decode_window(
    path: &Path,
    offset_seconds: f64,
    duration_seconds: f64,
) -> Result<DecodedAudio, DecodeError> {
    let offset_seconds = offset_seconds.max(0.0);
    let duration_seconds = duration_seconds.max(0.0);
    let decoded = if is_wav(path) {
        decode_wav_window(path, offset_seconds, duration_seconds)?
    } else {
        decode_symphonia_window(path, offset_seconds, duration_seconds)?
    };
    if decoded.samples.is_empty() {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
            offset_seconds,
        });
    }
    Ok(decoded)
}

/// Frame count covering `seconds` at `sample_rate`.
pub(crate) fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f64).round() as usize
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

fn decode_wav_window(
    path: &Path,
    offset_seconds: f64,
    duration_seconds: f64,
) -> Result<DecodedAudio, DecodeError> {
    let wav_err = |source| DecodeError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader =
        hound::WavReader::new(BufReader::with_capacity(1024 * 1024, file)).map_err(wav_err)?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate.max(1);
    let channels = spec.channels.max(1);
    // `duration` counts frames, independent of channel count.
    let total_frames = reader.duration() as usize;
    let start = seconds_to_frames(offset_seconds, sample_rate).min(total_frames);
    let frames = seconds_to_frames(duration_seconds, sample_rate).min(total_frames - start);
    reader.seek(start as u32).map_err(|err| wav_err(hound::Error::IoError(err)))?;

    let wanted = frames * channels as usize;
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .take(wanted)
            .collect::<Result<Vec<_>, _>>()
            .map_err(wav_err)?,
        SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
            reader
                .samples::<i32>()
                .take(wanted)
                .map(|s| s.map(|value| value as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(wav_err)?
        }
    };
    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

fn decode_symphonia_window(
    path: &Path,
    offset_seconds: f64,
    duration_seconds: f64,
) -> Result<DecodedAudio, DecodeError> {
    let sym_err = |source| DecodeError::Symphonia {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(sym_err)?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| DecodeError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::MissingParameter {
            path: path.to_path_buf(),
            what: "sample rate",
        })?
        .max(1);
    let channels = codec_params
        .channels
        .ok_or_else(|| DecodeError::MissingParameter {
            path: path.to_path_buf(),
            what: "channel count",
        })?
        .count()
        .max(1) as u16;
    let channel_count = channels as usize;
    let skip = seconds_to_frames(offset_seconds, sample_rate) * channel_count;
    let keep = seconds_to_frames(duration_seconds, sample_rate) * channel_count;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(sym_err)?;

    let mut consumed = 0usize;
    let mut samples = Vec::with_capacity(keep);
    while samples.len() < keep {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(sym_err(err)),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(sym_err(err)),
        };
        let spec = *audio_buf.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        let chunk = sample_buf.samples();
        let chunk_start = skip.saturating_sub(consumed).min(chunk.len());
        consumed += chunk.len();
        let remaining = keep - samples.len();
        let chunk = &chunk[chunk_start..];
        samples.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_ramp(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in 0..frames {
            for _ in 0..channels {
                writer.write_sample(frame as f32 / frames as f32).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_window_seeks_to_offset_and_limits_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ramp.wav");
        write_ramp(&path, 1_000, 2, 2_000);

        let decoded = decode_window(&path, 0.5, 1.0).unwrap();
        assert_eq!(decoded.sample_rate, 1_000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames(), 1_000);
        assert!((decoded.samples[0] - 500.0 / 2_000.0).abs() < 1e-6);
    }

    #[test]
    fn wav_window_past_end_is_returned_short() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.wav");
        write_ramp(&path, 1_000, 1, 400);

        let decoded = decode_window(&path, 0.0, 3.0).unwrap();
        assert_eq!(decoded.frames(), 400);
    }

    #[test]
    fn int_wav_is_scaled_to_unit_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("int.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..800 {
            writer.write_sample::<i16>(i16::MIN).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode_window(&path, 0.0, 1.0).unwrap();
        assert_eq!(decoded.frames(), 800);
        assert!((decoded.samples[0] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = TempDir::new().unwrap();
        let err = decode_window(&dir.path().join("absent.wav"), 0.0, 1.0).unwrap_err();
        assert!(matches!(err, DecodeError::Wav { .. } | DecodeError::Open { .. }));
    }

    #[test]
    fn offset_beyond_end_yields_empty_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.wav");
        write_ramp(&path, 1_000, 1, 100);

        let err = decode_window(&path, 5.0, 1.0).unwrap_err();
        assert!(matches!(err, DecodeError::Empty { .. }));
    }
}
