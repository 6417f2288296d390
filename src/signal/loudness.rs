//! Peak and RMS loudness normalization applied to single examples.

/// RMS level every normalized clip is driven toward, in dBFS.
pub const TARGET_RMS_DB: f32 = -25.0;
/// Guard term added to every divisor so silent clips stay finite.
pub const EPS: f32 = f32::EPSILON;

/// Peak-normalize, then scale toward [`TARGET_RMS_DB`] RMS.
///
/// Operates on one example only. Silent input stays silent: both divisors
/// carry [`EPS`], so zero peak or zero RMS never produces a NaN. No limiter
/// runs afterwards, so a clip with a very high crest factor can peak above
/// full scale once its RMS reaches the target.
pub fn normalize_loudness_in_place(samples: &mut [f32]) {
    let peak_gain = 1.0 / (peak(samples) + EPS);
    scale_in_place(samples, peak_gain);

    let rms_gain = db_to_linear(TARGET_RMS_DB) / (rms(samples) + EPS);
    scale_in_place(samples, rms_gain);
}

/// Copying variant of [`normalize_loudness_in_place`].
pub fn normalize_loudness(samples: &[f32]) -> Vec<f32> {
    let mut out = samples.to_vec();
    normalize_loudness_in_place(&mut out);
    out
}

/// Maximum absolute sample value, `0.0` for empty input.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
}

/// Root-mean-square level, `0.0` for empty input.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum = samples
        .iter()
        .fold(0.0_f64, |acc, &s| acc + s as f64 * s as f64);
    (sum / samples.len() as f64).sqrt() as f32
}

pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

fn scale_in_place(samples: &mut [f32], gain: f32) {
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}
