/// Output length for `frames` source frames: `round(frames * output_rate / input_rate)`.
pub fn resampled_len(frames: usize, input_rate: u32, output_rate: u32) -> usize {
    let input_rate = input_rate.max(1) as u128;
    let output_rate = output_rate.max(1) as u128;
    ((frames as u128 * output_rate * 2 + input_rate) / (input_rate * 2)) as usize
}

/// Linearly resample mono samples from `input_rate` to `output_rate`.
pub fn resample_linear(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate.max(1) == output_rate.max(1) {
        return samples.to_vec();
    }
    let len = resampled_len(samples.len(), input_rate, output_rate);
    let mut out = Vec::with_capacity(len);
    resample_linear_into(&mut out, samples, input_rate, output_rate, len);
    out
}

/// Append exactly `len` output samples to `out`.
///
/// Output sample `i` sits at source position `i * input_rate / output_rate`,
/// computed in integers so long windows do not drift. Positions past the last
/// source frame hold that frame's value.
pub fn resample_linear_into(
    out: &mut Vec<f32>,
    samples: &[f32],
    input_rate: u32,
    output_rate: u32,
    len: usize,
) {
    let Some(&last) = samples.last() else {
        out.resize(out.len() + len, 0.0);
        return;
    };
    let input_rate = input_rate.max(1) as u64;
    let output_rate = output_rate.max(1) as u64;
    out.reserve(len);
    out.extend((0..len as u64).map(|i| {
        let numerator = i * input_rate;
        let idx = (numerator / output_rate) as usize;
        let frac = (numerator % output_rate) as f32 / output_rate as f32;
        match (samples.get(idx), samples.get(idx + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a,
            _ => last,
        }
    }));
}
