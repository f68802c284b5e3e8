use crate::error::Result;
use crate::signal_processing::Filter;
use crate::signal_processing::fir_design::{self, FirResponse};

/// FIR filter evaluated sample by sample over a circular delay line
///
/// Tap design lives in `fir_design`; this type only owns the taps and the
/// ring buffer and performs the convolution.
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f64>,
    delay_line: Vec<f64>,
    pos: usize,
}

impl FirFilter {
    /// Create a new FIR filter with the given tap coefficients
    pub fn new(taps: Vec<f64>) -> Self {
        let taps = if taps.is_empty() { vec![1.0] } else { taps };
        Self {
            delay_line: vec![0.0; taps.len()],
            taps,
            pos: 0,
        }
    }

    /// Design taps for `response` and wrap them in a filter
    pub fn design(response: FirResponse, sample_rate: f64, order: usize) -> Result<Self> {
        Ok(Self::new(fir_design::design(response, sample_rate, order)?))
    }

    /// Get the number of taps (filter length)
    pub fn num_taps(&self) -> usize {
        self.taps.len()
    }

    /// Get the group delay in samples (half the filter length for linear phase)
    pub fn group_delay_samples(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Get access to the tap coefficients
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }
}

impl Filter for FirFilter {
    fn process(&mut self, sample: f32) -> f32 {
        self.delay_line[self.pos] = sample as f64;

        let mut output = 0.0f64;
        let n = self.taps.len();

        // Iterate the ring buffer in two contiguous reverse ranges to avoid
        // modulo arithmetic in the inner convolution loop.
        let mut tap_i = 0usize;
        for delay_idx in (0..=self.pos).rev() {
            output += self.taps[tap_i] * self.delay_line[delay_idx];
            tap_i += 1;
        }
        for delay_idx in ((self.pos + 1)..n).rev() {
            output += self.taps[tap_i] * self.delay_line[delay_idx];
            tap_i += 1;
        }
        debug_assert_eq!(tap_i, n);

        self.pos += 1;
        if self.pos == n {
            self.pos = 0;
        }
        output as f32
    }

    fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.pos = 0;
    }
}
