use std::f64::consts::PI;
use std::sync::Arc;

use crate::constants::DIVISION_EPSILON;
use crate::error::{Result, TempoError};
use crate::signal_processing::Filter;
use crate::signal_processing::window::{WindowCache, WindowFunction};

/// Complex spectrum as separate real and imaginary parts
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub re: Vec<f64>,
    pub im: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    pub fn magnitude(&self) -> Vec<f64> {
        self.re
            .iter()
            .zip(&self.im)
            .map(|(re, im)| re.hypot(*im))
            .collect()
    }

    pub fn phase(&self) -> Vec<f64> {
        self.re
            .iter()
            .zip(&self.im)
            .map(|(re, im)| im.atan2(*re))
            .collect()
    }

    pub fn magnitude_db(&self) -> Vec<f64> {
        self.magnitude().into_iter().map(mag_to_db).collect()
    }
}

/// Convert a linear magnitude to dB, flooring at the division epsilon
pub fn mag_to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.max(DIVISION_EPSILON).log10()
}

/// Radix-2 FFT for one fixed power-of-two size
///
/// Twiddle tables and the bit-reversal permutation are built once at
/// construction. Window tables come from a `WindowCache` that may be shared
/// between instances.
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
    bit_reverse: Vec<usize>,
    windows: Arc<WindowCache>,
}

impl Fft {
    /// Create an FFT with its own window cache
    ///
    /// # Errors
    /// Returns `TempoError::InvalidFftSize` unless `size` is a power of two
    /// of at least 2.
    pub fn new(size: usize) -> Result<Self> {
        Self::with_cache(size, Arc::new(WindowCache::new()))
    }

    /// Create an FFT that draws window tables from `windows`
    pub fn with_cache(size: usize, windows: Arc<WindowCache>) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(TempoError::InvalidFftSize(size));
        }

        let half = size / 2;
        let (cos_table, sin_table): (Vec<f64>, Vec<f64>) = (0..half)
            .map(|i| (2.0 * PI * i as f64 / size as f64).sin_cos())
            .map(|(s, c)| (c, s))
            .unzip();

        let bits = size.trailing_zeros();
        let bit_reverse = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        Ok(Self {
            size,
            cos_table,
            sin_table,
            bit_reverse,
            windows,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of `samples` after applying `window`
    pub fn forward(&self, samples: &[f64], window: WindowFunction) -> Result<Spectrum> {
        self.check_len(samples.len())?;

        let table = self.windows.get(window, self.size);
        let correction = window.correction();

        let mut re = vec![0.0; self.size];
        let mut im = vec![0.0; self.size];
        for (i, &sample) in samples.iter().enumerate() {
            re[self.bit_reverse[i]] = sample * table[i] * correction;
        }
        self.butterflies(&mut re, &mut im, false);
        Ok(Spectrum { re, im })
    }

    /// Inverse transform back to real samples
    pub fn inverse(&self, spectrum: &Spectrum) -> Result<Vec<f64>> {
        self.check_len(spectrum.re.len())?;
        self.check_len(spectrum.im.len())?;

        let mut re = vec![0.0; self.size];
        let mut im = vec![0.0; self.size];
        for i in 0..self.size {
            let j = self.bit_reverse[i];
            re[j] = spectrum.re[i];
            im[j] = spectrum.im[i];
        }
        self.butterflies(&mut re, &mut im, true);

        let scale = 1.0 / self.size as f64;
        Ok(re.into_iter().map(|v| v * scale).collect())
    }

    /// Spectrum of a filter's impulse response over `size` samples
    pub fn filter_response<F>(&self, filter: &F, window: WindowFunction) -> Result<Spectrum>
    where
        F: Filter + Clone,
    {
        let impulse: Vec<f64> = filter
            .impulse_response(self.size)
            .into_iter()
            .map(f64::from)
            .collect();
        self.forward(&impulse, window)
    }

    /// Center frequency of `bin` for a given sample rate
    pub fn bin_frequency(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.size as f64
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(TempoError::InvalidFftSize(len));
        }
        Ok(())
    }

    /// In-place iterative Cooley-Tukey over bit-reversed input
    fn butterflies(&self, re: &mut [f64], im: &mut [f64], inverse: bool) {
        let n = self.size;
        let mut span = 2;
        while span <= n {
            let half = span / 2;
            let stride = n / span;
            for start in (0..n).step_by(span) {
                for j in 0..half {
                    let c = self.cos_table[j * stride];
                    let s = if inverse {
                        self.sin_table[j * stride]
                    } else {
                        -self.sin_table[j * stride]
                    };

                    let top = start + j;
                    let bottom = top + half;
                    let t_re = re[bottom] * c - im[bottom] * s;
                    let t_im = re[bottom] * s + im[bottom] * c;
                    re[bottom] = re[top] - t_re;
                    im[bottom] = im[top] - t_im;
                    re[top] += t_re;
                    im[top] += t_im;
                }
            }
            span *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::{BiquadCascade, FilterCharacteristic, FilterSpec};
    use approx::assert_abs_diff_eq;
    use rustfft::FftPlanner;
    use rustfft::num_complex::Complex;

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                (0.3 * t).sin() + 0.5 * (1.7 * t + 0.2).cos() - 0.1 * (i % 5) as f64
            })
            .collect()
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        for size in [0, 1, 3, 100, 1000] {
            assert!(matches!(
                Fft::new(size),
                Err(TempoError::InvalidFftSize(s)) if s == size
            ));
        }
        assert!(Fft::new(2).is_ok());
        assert!(Fft::new(4096).is_ok());
    }

    #[test]
    fn test_rejects_wrong_input_length() {
        let fft = Fft::new(64).unwrap();
        assert!(fft.forward(&[0.0; 32], WindowFunction::Rectangular).is_err());
    }

    #[test]
    fn test_round_trip_rectangular() {
        for n in [2, 8, 256, 2048] {
            let fft = Fft::new(n).unwrap();
            let x = test_signal(n);
            let spectrum = fft.forward(&x, WindowFunction::Rectangular).unwrap();
            let y = fft.inverse(&spectrum).unwrap();
            for (a, b) in x.iter().zip(&y) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_matches_rustfft() {
        let n = 512;
        let x = test_signal(n);
        let ours = Fft::new(n)
            .unwrap()
            .forward(&x, WindowFunction::Rectangular)
            .unwrap();

        let mut buffer: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

        for (k, reference) in buffer.iter().enumerate() {
            assert_abs_diff_eq!(ours.re[k], reference.re, epsilon = 1e-9);
            assert_abs_diff_eq!(ours.im[k], reference.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_windowed_sine_keeps_amplitude() {
        let n = 1024;
        let bin = 32;
        let x: Vec<f64> = (0..n)
            .map(|i| 0.8 * (2.0 * PI * bin as f64 * i as f64 / n as f64).sin())
            .collect();
        let fft = Fft::new(n).unwrap();
        for window in [
            WindowFunction::Rectangular,
            WindowFunction::Hann,
            WindowFunction::BlackmanHarris,
            WindowFunction::Hft90d,
        ] {
            let mag = fft.forward(&x, window).unwrap().magnitude();
            assert_abs_diff_eq!(mag[bin] * 2.0 / n as f64, 0.8, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_shared_cache_is_reused() {
        let cache = Arc::new(WindowCache::new());
        let a = Fft::with_cache(256, Arc::clone(&cache)).unwrap();
        let b = Fft::with_cache(256, Arc::clone(&cache)).unwrap();
        let x = test_signal(256);

        a.forward(&x, WindowFunction::Hann).unwrap();
        b.forward(&x, WindowFunction::Hann).unwrap();
        assert_eq!(cache.len(), 1);

        b.forward(&x, WindowFunction::Nuttall4).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_filter_response_matches_cascade() {
        let filter = BiquadCascade::design(&FilterSpec::lowpass(
            FilterCharacteristic::Butterworth,
            2,
            1000.0,
            44100.0,
        ))
        .unwrap();
        let fft = Fft::new(4096).unwrap();
        let mag = fft
            .filter_response(&filter, WindowFunction::Rectangular)
            .unwrap()
            .magnitude();

        for bin in [10, 93, 200, 400] {
            let freq = fft.bin_frequency(bin, 44100.0);
            let expected = filter.response(freq).norm();
            assert_abs_diff_eq!(mag[bin], expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_mag_to_db_floor() {
        assert_abs_diff_eq!(mag_to_db(1.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mag_to_db(0.1), -20.0, epsilon = 1e-9);
        assert!(mag_to_db(0.0).is_finite());
    }
}
