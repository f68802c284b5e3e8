use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::Result;
use crate::signal_processing::Filter;
use crate::signal_processing::biquad_design::{self, FilterSpec};

/// Normalized coefficients of one second-order section
///
/// The numerator is stored with `b0 == 1` and the overall gain carried by
/// `k`. A raw numerator whose `b0` is zero keeps `k = 1` and is only divided
/// by `a0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
    pub k: f64,
}

impl BiquadCoefficients {
    /// Normalize raw `[b0, b1, b2]` / `[a0, a1, a2]` coefficients
    pub fn from_raw(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        let k = if b[0] != 0.0 { b[0] / a0 } else { 1.0 };
        let scale = k * a0;
        Self {
            b0: b[0] / scale,
            b1: b[1] / scale,
            b2: b[2] / scale,
            a1: a[1] / a0,
            a2: a[2] / a0,
            k,
        }
    }

    /// Complex response at normalized angular frequency `w` (radians/sample)
    pub fn response(&self, w: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b0 + self.b1 * z1 + self.b2 * z2;
        let den = 1.0 + self.a1 * z1 + self.a2 * z2;
        num / den * self.k
    }

    /// Both poles lie strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// One Direct Form II section with its two-sample delay line
#[derive(Debug, Clone)]
pub struct BiquadSection {
    coeffs: BiquadCoefficients,
    z0: f64,
    z1: f64,
}

impl BiquadSection {
    pub fn new(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            z0: 0.0,
            z1: 0.0,
        }
    }

    #[inline]
    pub fn step(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let temp = input * c.k - c.a1 * self.z0 - c.a2 * self.z1;
        let output = c.b0 * temp + c.b1 * self.z0 + c.b2 * self.z1;
        self.z1 = self.z0;
        self.z0 = temp;
        output
    }

    pub fn reset(&mut self) {
        self.z0 = 0.0;
        self.z1 = 0.0;
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }
}

/// Ordered cascade of biquad sections, each feeding the next
///
/// Coefficients and state are `f64`; the `Filter` interface converts at the
/// boundary.
#[derive(Debug, Clone)]
pub struct BiquadCascade {
    sections: Vec<BiquadSection>,
    sample_rate: f64,
}

impl BiquadCascade {
    pub fn new(coeffs: Vec<BiquadCoefficients>, sample_rate: f64) -> Self {
        Self {
            sections: coeffs.into_iter().map(BiquadSection::new).collect(),
            sample_rate,
        }
    }

    /// Design the sections described by `spec` and build the cascade
    ///
    /// # Errors
    /// Returns `TempoError::InvalidFilterSpec` for out-of-range frequencies,
    /// zero order, or non-positive Q, bandwidth or sample rate.
    pub fn design(spec: &FilterSpec) -> Result<Self> {
        let coeffs = biquad_design::design_sections(spec)?;
        Ok(Self::new(coeffs, spec.sample_rate))
    }

    /// Run one sample through every section at full precision
    #[inline]
    pub fn step(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |acc, section| section.step(acc))
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Complex frequency response of the whole cascade at `freq_hz`
    pub fn response(&self, freq_hz: f64) -> Complex64 {
        let w = 2.0 * PI * freq_hz / self.sample_rate;
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.coeffs.response(w))
    }

    /// Cascade gain at `freq_hz` in dB
    pub fn magnitude_db(&self, freq_hz: f64) -> f64 {
        20.0 * self.response(freq_hz).norm().log10()
    }
}

impl Filter for BiquadCascade {
    fn process(&mut self, sample: f32) -> f32 {
        self.step(sample as f64) as f32
    }

    fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::biquad_design::{FilterCharacteristic, FilterKind};
    use approx::assert_abs_diff_eq;

    fn lowpass(characteristic: FilterCharacteristic, order: usize, cutoff: f64) -> BiquadCascade {
        BiquadCascade::design(&FilterSpec::new(
            FilterKind::Lowpass,
            characteristic,
            order,
            cutoff,
            44100.0,
        ))
        .unwrap()
    }

    #[test]
    fn test_from_raw_normalizes_numerator() {
        let c = BiquadCoefficients::from_raw([0.5, 1.0, 0.5], [2.0, 0.2, 0.1]);
        assert_abs_diff_eq!(c.b0, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.b1, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.b2, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.k, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(c.a1, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(c.a2, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_from_raw_zero_b0_keeps_unit_gain() {
        let c = BiquadCoefficients::from_raw([0.0, 0.4, 0.2], [2.0, 0.0, 0.0]);
        assert_eq!(c.k, 1.0);
        assert_abs_diff_eq!(c.b0, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.b1, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(c.b2, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_section_step_matches_difference_equation() {
        // y[n] = 0.5 x[n] + 0.5 x[n-1]
        let mut section = BiquadSection::new(BiquadCoefficients::from_raw(
            [0.5, 0.5, 0.0],
            [1.0, 0.0, 0.0],
        ));
        assert_abs_diff_eq!(section.step(1.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(section.step(0.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(section.step(0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_response_matches_measured_sine_gain() {
        let mut filter = lowpass(FilterCharacteristic::Butterworth, 2, 1000.0);
        let freq = 1500.0f64;
        let input: Vec<f32> = (0..44100)
            .map(|i| (2.0 * PI * freq * i as f64 / 44100.0).sin() as f32)
            .collect();
        let mut output = input.clone();
        filter.process_buffer(&mut output);

        let peak = output[22050..].iter().fold(0.0f32, |m, x| m.max(x.abs()));
        let predicted = filter.response(freq).norm();
        assert_abs_diff_eq!(peak as f64, predicted, epsilon = 0.01);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = lowpass(FilterCharacteristic::Bessel, 3, 800.0);
        let first: Vec<f32> = (0..64).map(|i| filter.process((i % 7) as f32)).collect();
        filter.reset();
        let second: Vec<f32> = (0..64).map(|i| filter.process((i % 7) as f32)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filtfilt_has_zero_phase() {
        let filter = lowpass(FilterCharacteristic::Butterworth, 2, 2000.0);
        let freq = 200.0f64;
        let input: Vec<f32> = (0..8820)
            .map(|i| (2.0 * PI * freq * i as f64 / 44100.0).sin() as f32)
            .collect();

        let output = filter.filtfilt(&input);

        // Away from the edges the passband sine comes back in phase.
        for i in 3000..5000 {
            assert_abs_diff_eq!(output[i], input[i], epsilon = 0.02);
        }
    }

    #[test]
    fn test_simulate_leaves_state_alone() {
        let mut filter = lowpass(FilterCharacteristic::Butterworth, 1, 500.0);
        filter.process(1.0);
        let before = filter.clone();
        let _ = filter.simulate(&[0.5; 32]);
        assert_eq!(filter.process(0.0), before.clone().process(0.0));
    }

    #[test]
    fn test_impulse_response_decays() {
        let filter = lowpass(FilterCharacteristic::Chebyshev1, 4, 1000.0);
        let h = filter.impulse_response(44100);
        let tail = h[40000..].iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!(tail < 1e-6, "impulse response tail {}", tail);
    }
}
