//! Linear-phase FIR tap design
//!
//! Lowpass taps are a Hamming-windowed sinc normalized to unity gain at DC.
//! Highpass is derived by spectral inversion, bandstop by summing a lowpass
//! and a highpass, and bandpass by inverting the bandstop. A Kaiser-windowed
//! band design is available when a stopband attenuation target matters.

use std::f64::consts::PI;

use crate::error::{Result, TempoError};

/// Frequency response requested from the FIR designer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirResponse {
    Lowpass { cutoff_hz: f64 },
    Highpass { cutoff_hz: f64 },
    Bandpass { low_hz: f64, high_hz: f64 },
    Bandstop { low_hz: f64, high_hz: f64 },
}

/// Design taps for `response`
///
/// Returns `order + 1` taps. Odd orders are rounded up so the response has a
/// center tap, which spectral inversion needs.
pub fn design(response: FirResponse, sample_rate: f64, order: usize) -> Result<Vec<f64>> {
    let order = even_order(order)?;
    let nyquist = sample_rate / 2.0;

    match response {
        FirResponse::Lowpass { cutoff_hz } => {
            check_frequency(cutoff_hz, nyquist)?;
            Ok(windowed_sinc(cutoff_hz, sample_rate, order))
        }
        FirResponse::Highpass { cutoff_hz } => {
            check_frequency(cutoff_hz, nyquist)?;
            let mut taps = windowed_sinc(cutoff_hz, sample_rate, order);
            invert(&mut taps);
            Ok(taps)
        }
        FirResponse::Bandstop { low_hz, high_hz } => {
            check_band(low_hz, high_hz, nyquist)?;
            Ok(bandstop(low_hz, high_hz, sample_rate, order))
        }
        FirResponse::Bandpass { low_hz, high_hz } => {
            check_band(low_hz, high_hz, nyquist)?;
            let mut taps = bandstop(low_hz, high_hz, sample_rate, order);
            invert(&mut taps);
            Ok(taps)
        }
    }
}

/// Kaiser-windowed band filter passing `low_hz..high_hz`
///
/// `low_hz == 0` gives a lowpass and `high_hz == sample_rate / 2` a highpass.
/// The attenuation target (dB) selects the Kaiser shape parameter; the
/// length is `order + 1` taps with odd orders rounded up.
pub fn kaiser_band(
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
    attenuation_db: f64,
    order: usize,
) -> Result<Vec<f64>> {
    let order = even_order(order)?;
    let nyquist = sample_rate / 2.0;
    if !(sample_rate > 0.0) || !(low_hz >= 0.0) || !(high_hz > low_hz) || high_hz > nyquist {
        return Err(TempoError::InvalidFilterSpec(format!(
            "Kaiser band {}-{} Hz invalid for sample rate {}",
            low_hz, high_hz, sample_rate
        )));
    }

    if !(attenuation_db.is_finite() && attenuation_db >= 0.0) {
        return Err(TempoError::InvalidFilterSpec(format!(
            "Kaiser attenuation must be a finite non-negative dB value, got {}",
            attenuation_db
        )));
    }

    let beta = kaiser_beta(attenuation_db);
    let i0_beta = bessel_i0(beta);
    let half = order / 2;

    let mut taps = vec![0.0; order + 1];
    for j in 0..=half {
        let ideal = if j == 0 {
            2.0 * (high_hz - low_hz) / sample_rate
        } else {
            let jf = j as f64;
            ((2.0 * PI * jf * high_hz / sample_rate).sin()
                - (2.0 * PI * jf * low_hz / sample_rate).sin())
                / (PI * jf)
        };
        let ratio = j as f64 / half as f64;
        let window = bessel_i0(beta * (1.0 - ratio * ratio).max(0.0).sqrt()) / i0_beta;
        taps[half + j] = ideal * window;
        taps[half - j] = ideal * window;
    }
    Ok(taps)
}

/// Kaiser shape parameter for a stopband attenuation in dB
pub fn kaiser_beta(attenuation_db: f64) -> f64 {
    if attenuation_db < 21.0 {
        0.0
    } else if attenuation_db > 50.0 {
        0.1102 * (attenuation_db - 8.7)
    } else {
        0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
    }
}

/// Zeroth-order modified Bessel function of the first kind (power series)
///
/// Non-finite input returns `|x|` (infinity or NaN) instead of iterating.
pub fn bessel_i0(x: f64) -> f64 {
    if !x.is_finite() {
        return x.abs();
    }
    let mut d = 0.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    loop {
        d += 2.0;
        term *= x * x / (d * d);
        sum += term;
        if term <= sum * 1e-9 {
            return sum;
        }
    }
}

fn even_order(order: usize) -> Result<usize> {
    if order < 2 {
        return Err(TempoError::InvalidFilterSpec(format!(
            "FIR order must be at least 2, got {}",
            order
        )));
    }
    if !order.is_multiple_of(2) {
        log::debug!("FIR order {} rounded up to {}", order, order + 1);
        Ok(order + 1)
    } else {
        Ok(order)
    }
}

fn check_frequency(freq_hz: f64, nyquist: f64) -> Result<()> {
    if !(nyquist > 0.0) || !(freq_hz > 0.0) || freq_hz >= nyquist {
        return Err(TempoError::InvalidFilterSpec(format!(
            "FIR cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
            freq_hz, nyquist
        )));
    }
    Ok(())
}

fn check_band(low_hz: f64, high_hz: f64, nyquist: f64) -> Result<()> {
    check_frequency(low_hz, nyquist)?;
    check_frequency(high_hz, nyquist)?;
    if low_hz >= high_hz {
        return Err(TempoError::InvalidFilterSpec(format!(
            "FIR band edges out of order: {} Hz >= {} Hz",
            low_hz, high_hz
        )));
    }
    Ok(())
}

fn windowed_sinc(cutoff_hz: f64, sample_rate: f64, order: usize) -> Vec<f64> {
    let omega = 2.0 * PI * cutoff_hz / sample_rate;
    let center = (order / 2) as f64;

    let mut taps: Vec<f64> = (0..=order)
        .map(|n| {
            let m = n as f64 - center;
            if m == 0.0 {
                omega
            } else {
                let hamming = 0.54 - 0.46 * (2.0 * PI * n as f64 / order as f64).cos();
                (omega * m).sin() / m * hamming
            }
        })
        .collect();

    let dc: f64 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap /= dc;
    }
    taps
}

fn invert(taps: &mut [f64]) {
    for tap in taps.iter_mut() {
        *tap = -*tap;
    }
    let center = (taps.len() - 1) / 2;
    taps[center] += 1.0;
}

fn bandstop(low_hz: f64, high_hz: f64, sample_rate: f64, order: usize) -> Vec<f64> {
    let low = windowed_sinc(low_hz, sample_rate, order);
    let mut high = windowed_sinc(high_hz, sample_rate, order);
    invert(&mut high);
    low.iter().zip(high.iter()).map(|(l, h)| l + h).collect()
}
