//! Window functions for spectral analysis
//!
//! Windows use the periodic form (period `n`). Each one carries an amplitude
//! correction so a full-scale sine keeps its amplitude after windowing.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TempoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WindowFunction {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Nuttall3,
    Nuttall3a,
    Nuttall3b,
    Nuttall4,
    Nuttall4a,
    Nuttall4b,
    Nuttall4c,
    Sft3f,
    Sft4f,
    Sft5f,
    Sft3m,
    Sft4m,
    Sft5m,
    Hft70,
    Hft95,
    Hft90d,
    Hft116d,
    Hft144d,
    Triangular,
    Cosine,
    Welch,
    /// Tukey window with a 0.5 taper fraction
    Tukey,
    Lanczos,
}

value_enum_text!(WindowFunction, "window function");

const TUKEY_ALPHA: f64 = 0.5;

impl WindowFunction {
    /// Cosine-sum coefficients, `w(z) = sum c_k cos(k z)`
    fn cosine_terms(self) -> Option<&'static [f64]> {
        use WindowFunction::*;
        let terms: &'static [f64] = match self {
            Hann => &[0.5, -0.5],
            Hamming => &[0.54, -0.46],
            Blackman => &[0.42, -0.5, 0.08],
            BlackmanHarris => &[0.35875, -0.48829, 0.14128, -0.01168],
            Nuttall3 => &[0.375, -0.5, 0.125],
            Nuttall3a => &[0.40897, -0.5, 0.09103],
            Nuttall3b => &[0.4243801, -0.4973406, 0.0782793],
            Nuttall4 => &[0.3125, -0.46875, 0.1875, -0.03125],
            Nuttall4a => &[0.338946, -0.481973, 0.161054, -0.018027],
            Nuttall4b => &[0.355768, -0.487396, 0.144232, -0.012604],
            Nuttall4c => &[0.3635819, -0.4891775, 0.1365995, -0.0106411],
            Sft3f => &[0.26526, -0.5, 0.23474],
            Sft4f => &[0.21706, -0.42103, 0.28294, -0.07897],
            Sft5f => &[0.1881, -0.36923, 0.28702, -0.13077, 0.02488],
            Sft3m => &[0.28235, -0.52105, 0.19659],
            Sft4m => &[0.241906, -0.460841, 0.255381, -0.041872],
            Sft5m => &[0.209671, -0.407331, 0.281225, -0.092669, 0.0091036],
            Hft70 => &[1.0, -1.90796, 1.07349, -0.18199],
            Hft95 => &[1.0, -1.9383379, 1.3045202, -0.4028270, 0.0350665],
            Hft90d => &[1.0, -1.942604, 1.340318, -0.440811, 0.043097],
            Hft116d => &[
                1.0, -1.9575375, 1.4780705, -0.6367431, 0.1228389, -0.0066288,
            ],
            Hft144d => &[
                1.0,
                -1.96760033,
                1.57983607,
                -0.81123644,
                0.22583558,
                -0.02773848,
                0.00090360,
            ],
            Rectangular | Triangular | Cosine | Welch | Tukey | Lanczos => return None,
        };
        Some(terms)
    }

    /// Amplitude correction: reciprocal of the window's mean value
    pub fn correction(self) -> f64 {
        if let Some(terms) = self.cosine_terms() {
            return 1.0 / terms[0];
        }
        match self {
            WindowFunction::Triangular => 2.0,
            WindowFunction::Cosine => PI / 2.0,
            WindowFunction::Welch => 1.5,
            WindowFunction::Tukey => 1.0 / (1.0 - TUKEY_ALPHA / 2.0),
            WindowFunction::Lanczos => 1.696_382,
            _ => 1.0,
        }
    }

    /// Window value at position `j` of a period-`n` window
    pub fn value(self, j: usize, n: usize) -> f64 {
        let n_f = n as f64;
        let x = j as f64 / n_f;

        if let Some(terms) = self.cosine_terms() {
            let z = 2.0 * PI * x;
            return terms
                .iter()
                .enumerate()
                .map(|(k, c)| c * (k as f64 * z).cos())
                .sum();
        }

        match self {
            WindowFunction::Triangular => 1.0 - (2.0 * x - 1.0).abs(),
            WindowFunction::Cosine => (PI * x).sin(),
            WindowFunction::Welch => 1.0 - (2.0 * x - 1.0).powi(2),
            WindowFunction::Tukey => {
                let edge = TUKEY_ALPHA / 2.0;
                if x < edge {
                    0.5 * (1.0 - (2.0 * PI * x / TUKEY_ALPHA).cos())
                } else if x > 1.0 - edge {
                    0.5 * (1.0 - (2.0 * PI * (1.0 - x) / TUKEY_ALPHA).cos())
                } else {
                    1.0
                }
            }
            WindowFunction::Lanczos => {
                let u = PI * (2.0 * x - 1.0);
                if u == 0.0 { 1.0 } else { u.sin() / u }
            }
            _ => 1.0,
        }
    }

    /// Generate `n` window samples
    pub fn generate(self, n: usize) -> Vec<f64> {
        (0..n).map(|j| self.value(j, n)).collect()
    }
}

/// Window tables keyed by `(window, size)`, shared between FFT instances
#[derive(Debug, Default)]
pub struct WindowCache {
    tables: Mutex<HashMap<(WindowFunction, usize), Arc<[f64]>>>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the table for `(window, n)`, generating it on first use
    pub fn get(&self, window: WindowFunction, n: usize) -> Arc<[f64]> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .entry((window, n))
            .or_insert_with(|| {
                log::trace!("Generating {} window of {} samples", window, n);
                window.generate(n).into()
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Apply `window` (with amplitude correction) to `samples` in place
pub fn apply(window: WindowFunction, samples: &mut [f64]) -> Result<()> {
    if samples.is_empty() {
        return Err(TempoError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    let n = samples.len();
    let correction = window.correction();
    for (j, sample) in samples.iter_mut().enumerate() {
        *sample *= window.value(j, n) * correction;
    }
    Ok(())
}
