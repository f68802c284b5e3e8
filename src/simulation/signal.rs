use std::f32::consts::PI;

/// Peak amplitude of generated clicks
pub const CLICK_AMPLITUDE: f32 = 0.9;

/// Length of a generated kick drum hit in seconds
pub const KICK_DURATION_SECS: f32 = 0.12;

/// Single-sample pulses every `60 / bpm` seconds, starting at `offset_secs`
///
/// Pulse positions are rounded from the exact beat times, so long trains do
/// not drift.
pub fn pulse_train(
    duration_secs: f32,
    sample_rate: u32,
    bpm: f32,
    offset_secs: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut samples = vec![0.0; num_samples];
    for index in beat_positions(num_samples, sample_rate, bpm, offset_secs) {
        samples[index] = amplitude;
    }
    samples
}

/// Short decaying noise-free clicks, one per beat
///
/// Each click is a 2 kHz burst under a 5 ms exponential envelope.
pub fn click_train(duration_secs: f32, sample_rate: u32, bpm: f32, offset_secs: f32) -> Vec<f32> {
    let envelope_secs = 0.005;
    burst_train(duration_secs, sample_rate, bpm, offset_secs, |t| {
        CLICK_AMPLITUDE * (-t / envelope_secs).exp() * (2.0 * PI * 2000.0 * t).cos()
    })
}

/// Kick drum hits: a pitch sweep from 150 Hz to 50 Hz with a fast decay
pub fn kick_train(duration_secs: f32, sample_rate: u32, bpm: f32, offset_secs: f32) -> Vec<f32> {
    burst_train(duration_secs, sample_rate, bpm, offset_secs, |t| {
        if t > KICK_DURATION_SECS {
            return 0.0;
        }
        // Phase of a linear sweep 150 -> 50 Hz over the hit
        let sweep = 100.0 / KICK_DURATION_SECS;
        let phase = 2.0 * PI * (150.0 * t - 0.5 * sweep * t * t);
        CLICK_AMPLITUDE * (-t * 30.0).exp() * phase.sin()
    })
}

/// Sine tone, useful as out-of-band interference
pub fn sine(duration_secs: f32, sample_rate: u32, freq_hz: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let omega = 2.0 * PI * freq_hz / sample_rate as f32;
    (0..num_samples)
        .map(|i| amplitude * (omega * i as f32).sin())
        .collect()
}

/// Interleave two channels `[L, R, L, R, ...]`, truncating to the shorter
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right)
        .flat_map(|(&l, &r)| [l, r])
        .collect()
}

/// Sum two signals sample by sample, keeping the longer length
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| a.get(i).copied().unwrap_or(0.0) + b.get(i).copied().unwrap_or(0.0))
        .collect()
}

fn beat_positions(
    num_samples: usize,
    sample_rate: u32,
    bpm: f32,
    offset_secs: f32,
) -> impl Iterator<Item = usize> {
    let period = 60.0 * sample_rate as f64 / bpm as f64;
    let start = offset_secs as f64 * sample_rate as f64;
    (0..)
        .map(move |k| (start + k as f64 * period).round() as usize)
        .take_while(move |&index| index < num_samples)
}

fn burst_train<F>(
    duration_secs: f32,
    sample_rate: u32,
    bpm: f32,
    offset_secs: f32,
    burst: F,
) -> Vec<f32>
where
    F: Fn(f32) -> f32,
{
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let burst_len = (KICK_DURATION_SECS * sample_rate as f32) as usize;
    let mut samples = vec![0.0; num_samples];
    for start in beat_positions(num_samples, sample_rate, bpm, offset_secs) {
        for (n, sample) in samples[start..].iter_mut().take(burst_len).enumerate() {
            *sample += burst(n as f32 / sample_rate as f32);
        }
    }
    samples
}
