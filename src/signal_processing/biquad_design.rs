//! Biquad coefficient design
//!
//! Lowpass and highpass designs are table driven: one RBJ section per stage
//! of the chosen analog prototype, each placed at the cutoff scaled by the
//! stage frequency factor. The remaining kinds repeat one RBJ section `order`
//! times at the cutoff. A-weighting is a fixed three-section design.

use std::f64::consts::{LN_2, PI};

use clap::ValueEnum;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_Q, MAX_SECTION_FREQ_RATIO, MAX_TABLE_ORDER};
use crate::error::{Result, TempoError};
use crate::signal_processing::biquad::BiquadCoefficients;
use crate::signal_processing::prototype::{self, ChebyshevRipple, Stage};

/// Analog prototype a cascade is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FilterCharacteristic {
    Butterworth,
    Bessel,
    #[serde(rename = "chebyshev-0.5")]
    #[value(name = "chebyshev-0.5")]
    Chebyshev05,
    #[serde(rename = "chebyshev-1")]
    #[value(name = "chebyshev-1")]
    Chebyshev1,
    #[serde(rename = "chebyshev-2")]
    #[value(name = "chebyshev-2")]
    Chebyshev2,
    #[serde(rename = "chebyshev-3")]
    #[value(name = "chebyshev-3")]
    Chebyshev3,
    /// Delay-normalized Bessel poles
    #[serde(alias = "allpass")]
    #[value(alias = "allpass")]
    AllPass,
}

/// Shape of the frequency response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    Lowpass,
    Highpass,
    /// Bandpass with 0 dB gain at the center frequency
    Bandpass,
    /// Bandpass with peak gain equal to Q
    BandpassSkirt,
    Bandstop,
    Peak,
    LowShelf,
    HighShelf,
    #[serde(alias = "allpass")]
    #[value(alias = "allpass")]
    AllPass,
    AWeighting,
}

value_enum_text!(FilterCharacteristic, "filter characteristic");
value_enum_text!(FilterKind, "filter kind");

/// Everything needed to design a biquad cascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub characteristic: FilterCharacteristic,
    /// Number of biquad sections (table designs: a `2 * order` pole prototype)
    pub order: usize,
    pub cutoff_hz: f64,
    pub sample_rate: f64,
    pub q: Option<f64>,
    /// Bandwidth in octaves; takes precedence over `q`
    pub bandwidth: Option<f64>,
    /// Total gain for peak and shelf kinds
    pub gain_db: Option<f64>,
}

impl FilterSpec {
    pub fn new(
        kind: FilterKind,
        characteristic: FilterCharacteristic,
        order: usize,
        cutoff_hz: f64,
        sample_rate: f64,
    ) -> Self {
        Self {
            kind,
            characteristic,
            order,
            cutoff_hz,
            sample_rate,
            q: None,
            bandwidth: None,
            gain_db: None,
        }
    }

    pub fn lowpass(
        characteristic: FilterCharacteristic,
        order: usize,
        cutoff_hz: f64,
        sample_rate: f64,
    ) -> Self {
        Self::new(
            FilterKind::Lowpass,
            characteristic,
            order,
            cutoff_hz,
            sample_rate,
        )
    }

    pub fn with_q(mut self, q: f64) -> Self {
        self.q = Some(q);
        self
    }

    pub fn with_bandwidth(mut self, octaves: f64) -> Self {
        self.bandwidth = Some(octaves);
        self
    }

    pub fn with_gain_db(mut self, gain_db: f64) -> Self {
        self.gain_db = Some(gain_db);
        self
    }

    /// Check the spec describes a realizable filter
    ///
    /// # Errors
    /// Returns `TempoError::InvalidFilterSpec` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(invalid(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.order == 0 {
            return Err(invalid("order must be at least 1".to_string()));
        }
        if self.kind != FilterKind::AWeighting {
            let nyquist = self.sample_rate / 2.0;
            if !(self.cutoff_hz > 0.0 && self.cutoff_hz < nyquist) {
                return Err(invalid(format!(
                    "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                    self.cutoff_hz, nyquist
                )));
            }
        }
        if let Some(q) = self.q
            && !(q.is_finite() && q > 0.0)
        {
            return Err(invalid(format!("Q must be positive, got {}", q)));
        }
        if let Some(bw) = self.bandwidth
            && !(bw.is_finite() && bw > 0.0)
        {
            return Err(invalid(format!("bandwidth must be positive, got {}", bw)));
        }
        if let Some(gain) = self.gain_db
            && !gain.is_finite()
        {
            return Err(invalid(format!("gain must be finite, got {}", gain)));
        }
        Ok(())
    }
}

fn invalid(message: String) -> TempoError {
    TempoError::InvalidFilterSpec(message)
}

/// Design the biquad sections for `spec`, first to last
pub fn design_sections(spec: &FilterSpec) -> Result<Vec<BiquadCoefficients>> {
    spec.validate()?;

    if spec.kind == FilterKind::AWeighting {
        return Ok(a_weighting(spec.sample_rate));
    }

    let order = clamp_order(spec.order);
    let table_driven = match spec.kind {
        FilterKind::Lowpass | FilterKind::Highpass => true,
        FilterKind::AllPass => spec.characteristic == FilterCharacteristic::AllPass,
        _ => false,
    };

    let sections = if table_driven {
        stages(spec.characteristic, order)
            .iter()
            .map(|stage| {
                let freq = match spec.kind {
                    FilterKind::Highpass => spec.cutoff_hz / stage.f,
                    _ => spec.cutoff_hz * stage.f,
                };
                rbj(
                    spec.kind,
                    clamp_section_freq(freq, spec.sample_rate),
                    spec.sample_rate,
                    Width::Q(stage.q),
                    0.0,
                )
            })
            .collect()
    } else {
        let mut q = spec.q.unwrap_or(DEFAULT_Q);
        let band = matches!(
            spec.kind,
            FilterKind::Bandpass | FilterKind::BandpassSkirt | FilterKind::Bandstop
        );
        if band && spec.characteristic == FilterCharacteristic::Bessel {
            q *= (order as f64).sqrt() / order as f64;
        }
        let width = match spec.bandwidth {
            Some(octaves) => Width::Octaves(octaves),
            None => Width::Q(q),
        };
        let gain_db = spec.gain_db.unwrap_or(0.0) / order as f64;
        let section = rbj(
            spec.kind,
            clamp_section_freq(spec.cutoff_hz, spec.sample_rate),
            spec.sample_rate,
            width,
            gain_db,
        );
        vec![section; order]
    };

    log::debug!(
        "Designed {} {} filter: {} sections at {} Hz (fs {} Hz)",
        spec.characteristic,
        spec.kind,
        order,
        spec.cutoff_hz,
        spec.sample_rate
    );
    Ok(sections)
}

fn clamp_order(order: usize) -> usize {
    if order > MAX_TABLE_ORDER {
        log::debug!("Filter order {} clamped to {}", order, MAX_TABLE_ORDER);
        MAX_TABLE_ORDER
    } else {
        order
    }
}

fn clamp_section_freq(freq_hz: f64, sample_rate: f64) -> f64 {
    freq_hz.min(MAX_SECTION_FREQ_RATIO * sample_rate)
}

fn stages(characteristic: FilterCharacteristic, order: usize) -> Vec<Stage> {
    match characteristic {
        FilterCharacteristic::Butterworth => prototype::butterworth(order),
        FilterCharacteristic::Bessel => prototype::bessel(order).to_vec(),
        FilterCharacteristic::Chebyshev05 => {
            prototype::chebyshev(order, ChebyshevRipple::HalfDb).to_vec()
        }
        FilterCharacteristic::Chebyshev1 => {
            prototype::chebyshev(order, ChebyshevRipple::OneDb).to_vec()
        }
        FilterCharacteristic::Chebyshev2 => {
            prototype::chebyshev(order, ChebyshevRipple::TwoDb).to_vec()
        }
        FilterCharacteristic::Chebyshev3 => {
            prototype::chebyshev(order, ChebyshevRipple::ThreeDb).to_vec()
        }
        FilterCharacteristic::AllPass => prototype::bessel_delay(order).to_vec(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Width {
    Q(f64),
    Octaves(f64),
}

/// One RBJ cookbook section
fn rbj(
    kind: FilterKind,
    freq_hz: f64,
    sample_rate: f64,
    width: Width,
    gain_db: f64,
) -> BiquadCoefficients {
    let w = 2.0 * PI * freq_hz / sample_rate;
    let (sw, cw) = w.sin_cos();
    let alpha = match width {
        Width::Q(q) => sw / (2.0 * q),
        Width::Octaves(bw) => sw * (LN_2 / 2.0 * bw * w / sw).sinh(),
    };
    let amp = 10f64.powf(gain_db / 40.0);

    let (b, a) = match kind {
        FilterKind::Lowpass => (
            [(1.0 - cw) / 2.0, 1.0 - cw, (1.0 - cw) / 2.0],
            [1.0 + alpha, -2.0 * cw, 1.0 - alpha],
        ),
        FilterKind::Highpass => (
            [(1.0 + cw) / 2.0, -(1.0 + cw), (1.0 + cw) / 2.0],
            [1.0 + alpha, -2.0 * cw, 1.0 - alpha],
        ),
        FilterKind::Bandpass => ([alpha, 0.0, -alpha], [1.0 + alpha, -2.0 * cw, 1.0 - alpha]),
        FilterKind::BandpassSkirt => (
            [sw / 2.0, 0.0, -sw / 2.0],
            [1.0 + alpha, -2.0 * cw, 1.0 - alpha],
        ),
        FilterKind::Bandstop => ([1.0, -2.0 * cw, 1.0], [1.0 + alpha, -2.0 * cw, 1.0 - alpha]),
        FilterKind::AllPass => (
            [1.0 - alpha, -2.0 * cw, 1.0 + alpha],
            [1.0 + alpha, -2.0 * cw, 1.0 - alpha],
        ),
        FilterKind::Peak => (
            [1.0 + alpha * amp, -2.0 * cw, 1.0 - alpha * amp],
            [1.0 + alpha / amp, -2.0 * cw, 1.0 - alpha / amp],
        ),
        FilterKind::LowShelf => {
            let beta = 2.0 * amp.sqrt() * alpha;
            (
                [
                    amp * ((amp + 1.0) - (amp - 1.0) * cw + beta),
                    2.0 * amp * ((amp - 1.0) - (amp + 1.0) * cw),
                    amp * ((amp + 1.0) - (amp - 1.0) * cw - beta),
                ],
                [
                    (amp + 1.0) + (amp - 1.0) * cw + beta,
                    -2.0 * ((amp - 1.0) + (amp + 1.0) * cw),
                    (amp + 1.0) + (amp - 1.0) * cw - beta,
                ],
            )
        }
        FilterKind::HighShelf => {
            let beta = 2.0 * amp.sqrt() * alpha;
            (
                [
                    amp * ((amp + 1.0) + (amp - 1.0) * cw + beta),
                    -2.0 * amp * ((amp - 1.0) + (amp + 1.0) * cw),
                    amp * ((amp + 1.0) + (amp - 1.0) * cw - beta),
                ],
                [
                    (amp + 1.0) - (amp - 1.0) * cw + beta,
                    2.0 * ((amp - 1.0) - (amp + 1.0) * cw),
                    (amp + 1.0) - (amp - 1.0) * cw - beta,
                ],
            )
        }
        // Handled by `a_weighting`; a unity section keeps this total.
        FilterKind::AWeighting => ([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    };
    BiquadCoefficients::from_raw(b, a)
}

// IEC 61672 pole frequencies
const A_WEIGHT_F1: f64 = 20.598_997;
const A_WEIGHT_F2: f64 = 107.652_65;
const A_WEIGHT_F3: f64 = 737.862_23;
const A_WEIGHT_F4: f64 = 12_194.217;

/// A-weighting as three bilinear-transformed sections, 0 dB at 1 kHz
fn a_weighting(sample_rate: f64) -> Vec<BiquadCoefficients> {
    let w1 = 2.0 * PI * A_WEIGHT_F1;
    let w2 = 2.0 * PI * A_WEIGHT_F2;
    let w3 = 2.0 * PI * A_WEIGHT_F3;
    let w4 = 2.0 * PI * A_WEIGHT_F4;

    // Analog sections as [s^2, s, 1] coefficients
    let analog = [
        ([1.0, 0.0, 0.0], [1.0, 2.0 * w4, w4 * w4]),
        ([1.0, 0.0, 0.0], [1.0, 2.0 * w1, w1 * w1]),
        ([0.0, 0.0, 1.0], [1.0, w2 + w3, w2 * w3]),
    ];
    let mut sections: Vec<BiquadCoefficients> = analog
        .iter()
        .map(|&(num, den)| bilinear(num, den, sample_rate))
        .collect();

    let w_ref = 2.0 * PI * 1000.0 / sample_rate;
    let gain = sections
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(w_ref))
        .norm();
    if gain > 0.0 {
        sections[0].k /= gain;
    }
    sections
}

fn bilinear(num: [f64; 3], den: [f64; 3], sample_rate: f64) -> BiquadCoefficients {
    let k = 2.0 * sample_rate;
    let k2 = k * k;
    let map = |c: [f64; 3]| {
        [
            c[0] * k2 + c[1] * k + c[2],
            2.0 * (c[2] - c[0] * k2),
            c[0] * k2 - c[1] * k + c[2],
        ]
    };
    BiquadCoefficients::from_raw(map(num), map(den))
}
