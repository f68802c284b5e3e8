use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Impairments added to a clean synthetic signal
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub dropout: Option<DropoutConfig>,
    pub jitter: Option<JitterConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, snr_db: f32) -> Self {
        self.additive = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    pub fn with_dropout(mut self, probability: f32) -> Self {
        self.dropout = Some(DropoutConfig { probability });
        self
    }

    pub fn with_jitter(mut self, max_shift: f32) -> Self {
        self.jitter = Some(JitterConfig { max_shift });
        self
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f32,
}

/// Silences whole beats at random
#[derive(Clone, Debug, serde::Deserialize)]
pub struct DropoutConfig {
    /// Chance of dropping each beat, in [0, 1]
    pub probability: f32,
}

/// Moves each beat by a uniform random shift
#[derive(Clone, Debug, serde::Deserialize)]
pub struct JitterConfig {
    /// Largest shift as a fraction of the beat period
    pub max_shift: f32,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn signal_power(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f32>() / signal.len() as f32
}

/// Uniform white noise in `[-amplitude, amplitude]`
pub fn white_noise(num_samples: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..num_samples)
        .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * amplitude)
        .collect()
}

/// Gaussian noise with standard deviation `sigma`
pub fn gaussian_noise(num_samples: usize, sigma: f32, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    match Normal::new(0.0f32, sigma.max(0.0)) {
        Ok(normal) => (0..num_samples).map(|_| normal.sample(&mut rng)).collect(),
        Err(_) => vec![0.0; num_samples],
    }
}

fn apply_additive_noise(signal: &mut [f32], config: &AdditiveNoiseConfig, rng: &mut ChaCha8Rng) {
    let power = signal_power(signal);
    if power <= 0.0 {
        return;
    }
    let noise_power = power / 10f32.powf(config.snr_db / 10.0);
    let Ok(normal) = Normal::new(0.0f32, noise_power.sqrt()) else {
        return;
    };
    for sample in signal.iter_mut() {
        *sample += normal.sample(rng);
    }
}

/// Apply beat-level impairments to a train of beats at `period` samples
///
/// Dropout and jitter act on whole beat slots, so the signal must be a beat
/// train starting at sample 0. Additive noise applies to every sample.
pub fn apply_noise(clean_signal: &[f32], config: &NoiseConfig, period: usize) -> Vec<f32> {
    let mut rng = create_rng(config.seed);
    let period = period.max(1);
    let mut signal = vec![0.0; clean_signal.len()];

    for (slot, beat) in clean_signal.chunks(period).enumerate() {
        if let Some(ref dropout) = config.dropout
            && rng.random::<f32>() < dropout.probability
        {
            continue;
        }
        let shift = match config.jitter {
            Some(ref jitter) => {
                let max = (jitter.max_shift.abs() * period as f32) as isize;
                if max > 0 {
                    rng.random_range(-(max as i64)..=max as i64) as isize
                } else {
                    0
                }
            }
            None => 0,
        };
        let start = slot * period;
        for (n, &value) in beat.iter().enumerate() {
            let target = (start + n) as isize + shift;
            if target >= 0 && (target as usize) < signal.len() {
                signal[target as usize] += value;
            }
        }
    }

    if let Some(ref additive) = config.additive {
        apply_additive_noise(&mut signal, additive, &mut rng);
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_noise_seeded_and_bounded() {
        let a = white_noise(1000, 0.5, 7);
        let b = white_noise(1000, 0.5, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.abs() <= 0.5));
        assert_ne!(a, white_noise(1000, 0.5, 8));
    }

    #[test]
    fn test_awgn_snr() {
        let clean: Vec<f32> = (0..20000).map(|i| (i as f32 * 0.05).sin()).collect();
        let config = NoiseConfig::default().with_seed(1).with_awgn(10.0);
        let noisy = apply_noise(&clean, &config, clean.len());
        let noise: Vec<f32> = noisy.iter().zip(&clean).map(|(n, c)| n - c).collect();
        let snr = 10.0 * (signal_power(&clean) / signal_power(&noise)).log10();
        assert!((snr - 10.0).abs() < 0.5, "snr {}", snr);
    }

    #[test]
    fn test_full_dropout_silences() {
        let clean = vec![1.0; 100];
        let config = NoiseConfig::default().with_seed(3).with_dropout(1.0);
        assert!(apply_noise(&clean, &config, 10).iter().all(|&s| s == 0.0));
    }
}
