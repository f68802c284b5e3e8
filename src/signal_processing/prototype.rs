//! Analog prototype stage tables for table-driven biquad cascades
//!
//! A design of order `n` is a cascade of `n` second-order stages, i.e. a
//! `2n`-pole analog prototype. Each conjugate pole pair `p` becomes one
//! stage with frequency factor `f = |p|` and quality `Q = |p| / (2|Re p|)`.
//! Tables are built once per characteristic and cached for the process.

use std::f64::consts::PI;
use std::sync::OnceLock;

use num_complex::Complex64;

use crate::constants::MAX_TABLE_ORDER;

/// One second-order stage of a normalized analog prototype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    /// Stage quality factor
    pub q: f64,
    /// Stage natural frequency relative to the design cutoff
    pub f: f64,
}

type StageTable = Vec<Vec<Stage>>;

/// Butterworth stages, computed analytically
pub fn butterworth(order: usize) -> Vec<Stage> {
    (0..order)
        .map(|i| Stage {
            q: 0.5 / (PI / (2.0 * order as f64) * (i as f64 + 0.5)).sin(),
            f: 1.0,
        })
        .collect()
}

/// Bessel stages normalized to -3 dB at the cutoff
pub fn bessel(order: usize) -> &'static [Stage] {
    static TABLE: OnceLock<StageTable> = OnceLock::new();
    lookup(&TABLE, order, |n| bessel_stages(n, true))
}

/// Bessel stages normalized to unit group delay at DC
pub fn bessel_delay(order: usize) -> &'static [Stage] {
    static TABLE: OnceLock<StageTable> = OnceLock::new();
    lookup(&TABLE, order, |n| bessel_stages(n, false))
}

/// Chebyshev type I stages for a passband ripple in dB
///
/// The cutoff is the ripple band edge, where the gain has fallen by the
/// ripple amount.
pub fn chebyshev(order: usize, ripple_db: ChebyshevRipple) -> &'static [Stage] {
    static HALF_DB: OnceLock<StageTable> = OnceLock::new();
    static ONE_DB: OnceLock<StageTable> = OnceLock::new();
    static TWO_DB: OnceLock<StageTable> = OnceLock::new();
    static THREE_DB: OnceLock<StageTable> = OnceLock::new();

    let (table, ripple) = match ripple_db {
        ChebyshevRipple::HalfDb => (&HALF_DB, 0.5),
        ChebyshevRipple::OneDb => (&ONE_DB, 1.0),
        ChebyshevRipple::TwoDb => (&TWO_DB, 2.0),
        ChebyshevRipple::ThreeDb => (&THREE_DB, 3.0),
    };
    lookup(table, order, |n| chebyshev_stages(n, ripple))
}

/// Passband ripple of the tabulated Chebyshev designs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChebyshevRipple {
    HalfDb,
    OneDb,
    TwoDb,
    ThreeDb,
}

fn lookup(
    table: &'static OnceLock<StageTable>,
    order: usize,
    build: impl Fn(usize) -> Vec<Stage>,
) -> &'static [Stage] {
    let rows = table.get_or_init(|| (1..=MAX_TABLE_ORDER).map(&build).collect());
    let index = order.clamp(1, MAX_TABLE_ORDER) - 1;
    &rows[index]
}

fn stages_from_poles(poles: &[Complex64]) -> Vec<Stage> {
    let mut stages: Vec<Stage> = poles
        .iter()
        .filter(|p| p.im > 0.0)
        .map(|p| {
            let f = p.norm();
            Stage {
                q: f / (2.0 * p.re.abs()),
                f,
            }
        })
        .collect();
    stages.sort_by(|a, b| b.q.total_cmp(&a.q));
    stages
}

fn chebyshev_stages(order: usize, ripple_db: f64) -> Vec<Stage> {
    let poles_count = 2 * order;
    let epsilon = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / epsilon).asinh() / poles_count as f64;

    let poles: Vec<Complex64> = (1..=order)
        .map(|k| {
            let theta = (2 * k - 1) as f64 * PI / (2.0 * poles_count as f64);
            Complex64::new(-mu.sinh() * theta.sin(), mu.cosh() * theta.cos())
        })
        .collect();
    stages_from_poles(&poles)
}

fn bessel_stages(order: usize, normalize_3db: bool) -> Vec<Stage> {
    let degree = 2 * order;
    let coeffs = reverse_bessel_coefficients(degree);
    let mut poles = polynomial_roots(&coeffs);

    if normalize_3db {
        let w3 = half_power_frequency(&coeffs);
        for p in poles.iter_mut() {
            *p /= w3;
        }
    }
    stages_from_poles(&poles)
}

/// Coefficients (ascending powers) of the reverse Bessel polynomial
///
/// `a_k = (2n-k)! / (2^(n-k) k! (n-k)!)`, built from `a_n = 1` downwards.
fn reverse_bessel_coefficients(degree: usize) -> Vec<f64> {
    let n = degree;
    let mut coeffs = vec![0.0; n + 1];
    coeffs[n] = 1.0;
    for k in (1..=n).rev() {
        let ratio = ((2 * n - k + 1) * k) as f64 / (2 * (n - k + 1)) as f64;
        coeffs[k - 1] = coeffs[k] * ratio;
    }
    coeffs
}

fn eval_polynomial(coeffs: &[f64], z: Complex64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
}

/// Frequency where a lowpass `a_0 / B(s)` is 3 dB down
fn half_power_frequency(coeffs: &[f64]) -> f64 {
    let target = std::f64::consts::SQRT_2 * coeffs[0];
    let magnitude = |w: f64| eval_polynomial(coeffs, Complex64::new(0.0, w)).norm();

    let mut lo = 0.0;
    let mut hi = 1.0;
    while magnitude(hi) < target {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if magnitude(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-15 * hi {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Roots of a monic polynomial (ascending coefficients) by Durand-Kerner
/// iteration followed by Newton polishing
fn polynomial_roots(coeffs: &[f64]) -> Vec<Complex64> {
    let n = coeffs.len() - 1;
    let radius = coeffs[0].abs().powf(1.0 / n as f64).max(1.0);
    let mut roots: Vec<Complex64> = (0..n)
        .map(|k| Complex64::from_polar(radius, 2.0 * PI * k as f64 / n as f64 + 0.4))
        .collect();

    for _ in 0..2000 {
        let mut max_step = 0.0f64;
        for k in 0..n {
            let zk = roots[k];
            let denom = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != k)
                .fold(Complex64::new(1.0, 0.0), |acc, (_, &zj)| acc * (zk - zj));
            let step = eval_polynomial(coeffs, zk) / denom;
            roots[k] = zk - step;
            max_step = max_step.max(step.norm());
        }
        if max_step < 1e-13 * radius {
            break;
        }
    }

    let derivative: Vec<f64> = coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, &c)| k as f64 * c)
        .collect();
    for root in roots.iter_mut() {
        for _ in 0..3 {
            let slope = eval_polynomial(&derivative, *root);
            if slope.norm() == 0.0 {
                break;
            }
            *root -= eval_polynomial(coeffs, *root) / slope;
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_butterworth_single_stage_is_maximally_flat() {
        let stages = butterworth(1);
        assert_eq!(stages.len(), 1);
        assert_abs_diff_eq!(stages[0].q, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_butterworth_two_stage_qs() {
        let stages = butterworth(2);
        assert_abs_diff_eq!(stages[0].q, 1.306_562_964_876, epsilon = 1e-9);
        assert_abs_diff_eq!(stages[1].q, 0.541_196_100_146, epsilon = 1e-9);
    }

    #[test]
    fn test_bessel_matches_reference_stages() {
        let one = bessel(1);
        assert_abs_diff_eq!(one[0].q, 0.577_350_269, epsilon = 1e-6);
        assert_abs_diff_eq!(one[0].f, 1.272_019_649, epsilon = 1e-6);

        let two = bessel(2);
        assert_abs_diff_eq!(two[0].q, 0.805_538_282, epsilon = 1e-6);
        assert_abs_diff_eq!(two[0].f, 1.603_357_516, epsilon = 1e-6);
        assert_abs_diff_eq!(two[1].q, 0.521_934_582, epsilon = 1e-6);
        assert_abs_diff_eq!(two[1].f, 1.430_171_560, epsilon = 1e-6);
    }

    #[test]
    fn test_bessel_tables_cover_all_orders() {
        for order in 1..=MAX_TABLE_ORDER {
            let stages = bessel(order);
            assert_eq!(stages.len(), order);
            for stage in stages {
                assert!(stage.q.is_finite() && stage.q > 0.5 - 1e-9, "{:?}", stage);
                assert!(stage.f.is_finite() && stage.f > 0.0, "{:?}", stage);
            }
        }
    }

    #[test]
    fn test_bessel_delay_unit_group_delay_first_order() {
        // s^2 + 3s + 3: poles at -1.5 +/- j0.866
        let stages = bessel_delay(1);
        assert_abs_diff_eq!(stages[0].f, 3.0f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(stages[0].q, 3.0f64.sqrt() / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_chebyshev_one_db_two_pole() {
        // Reference two-pole 1 dB Chebyshev: Q = 0.9565, f = 1.0500
        let stages = chebyshev(1, ChebyshevRipple::OneDb);
        assert_abs_diff_eq!(stages[0].q, 0.9565, epsilon = 1e-3);
        assert_abs_diff_eq!(stages[0].f, 1.0500, epsilon = 1e-3);
    }

    #[test]
    fn test_chebyshev_ripple_raises_q() {
        for order in 1..=MAX_TABLE_ORDER {
            let half = chebyshev(order, ChebyshevRipple::HalfDb);
            let three = chebyshev(order, ChebyshevRipple::ThreeDb);
            assert!(three[0].q > half[0].q);
        }
    }

    #[test]
    fn test_reverse_bessel_coefficients() {
        // theta_3(s) = s^3 + 6s^2 + 15s + 15
        assert_eq!(reverse_bessel_coefficients(3), vec![15.0, 15.0, 6.0, 1.0]);
    }
}
