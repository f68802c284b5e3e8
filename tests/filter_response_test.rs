use approx::assert_abs_diff_eq;
use tempotrack::signal_processing::{
    BiquadCascade, Fft, Filter, FilterCharacteristic, FilterKind, FilterSpec, FirFilter,
    FirResponse, WindowFunction,
};
use tempotrack::simulation::{sine, white_noise};

const FS: f64 = 44100.0;

const CHARACTERISTICS: [FilterCharacteristic; 6] = [
    FilterCharacteristic::Butterworth,
    FilterCharacteristic::Bessel,
    FilterCharacteristic::Chebyshev05,
    FilterCharacteristic::Chebyshev1,
    FilterCharacteristic::Chebyshev2,
    FilterCharacteristic::Chebyshev3,
];

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn test_cascades_stay_bounded_on_random_input() {
    let input = white_noise(8192, 1.0, 2024);
    let input_peak = peak(&input);

    for characteristic in CHARACTERISTICS {
        for kind in [FilterKind::Lowpass, FilterKind::Highpass] {
            for order in [1, 2, 3, 4, 6, 8, 10, 12] {
                for cutoff in [30.0, 150.0, 600.0, 1500.0] {
                    let spec = FilterSpec::new(kind, characteristic, order, cutoff, FS);
                    let mut cascade = BiquadCascade::design(&spec).unwrap();
                    assert!(
                        cascade.sections().iter().all(|s| s.coefficients().is_stable()),
                        "{} {} order {} at {} Hz has an unstable section",
                        characteristic,
                        kind,
                        order,
                        cutoff
                    );

                    let mut output = input.clone();
                    cascade.process_buffer(&mut output);
                    let output_peak = peak(&output);
                    assert!(
                        output_peak.is_finite() && output_peak <= 10.0 * input_peak,
                        "{} {} order {} at {} Hz: output peak {}",
                        characteristic,
                        kind,
                        order,
                        cutoff,
                        output_peak
                    );
                }
            }
        }
    }
}

#[test]
fn test_band_and_allpass_designs_stay_bounded() {
    let input = white_noise(8192, 1.0, 77);
    let input_peak = peak(&input);

    let specs = [
        FilterSpec::new(FilterKind::Bandpass, FilterCharacteristic::Bessel, 4, 100.0, FS),
        FilterSpec::new(FilterKind::BandpassSkirt, FilterCharacteristic::Butterworth, 2, 200.0, FS)
            .with_q(2.0),
        FilterSpec::new(FilterKind::Bandstop, FilterCharacteristic::Butterworth, 3, 1000.0, FS)
            .with_bandwidth(1.0),
        FilterSpec::new(FilterKind::Peak, FilterCharacteristic::Butterworth, 2, 120.0, FS)
            .with_gain_db(3.0),
        FilterSpec::new(FilterKind::LowShelf, FilterCharacteristic::Butterworth, 2, 250.0, FS)
            .with_gain_db(6.0),
        FilterSpec::new(FilterKind::AllPass, FilterCharacteristic::AllPass, 12, 5000.0, FS),
        FilterSpec::new(FilterKind::AWeighting, FilterCharacteristic::Butterworth, 1, 1000.0, FS),
    ];

    for spec in specs {
        let cascade = BiquadCascade::design(&spec).unwrap();
        let output = cascade.simulate(&input);
        assert!(
            peak(&output) <= 10.0 * input_peak,
            "{} {} peak {}",
            spec.characteristic,
            spec.kind,
            peak(&output)
        );
    }
}

/// Energy of the spectrum above `from_hz` in a steady-state stretch
fn high_band_energy(signal: &[f32], from_hz: f64) -> f64 {
    let fft = Fft::new(4096).unwrap();
    let segment: Vec<f64> = signal[4096..8192].iter().map(|&s| s as f64).collect();
    let spectrum = fft.forward(&segment, WindowFunction::Hann).unwrap();
    spectrum
        .magnitude()
        .iter()
        .enumerate()
        .take(2048)
        .filter(|(bin, _)| fft.bin_frequency(*bin, FS) >= from_hz)
        .map(|(_, m)| m * m)
        .sum()
}

#[test]
fn test_higher_order_lowpass_attenuates_more() {
    let input = white_noise(8192, 0.5, 5);
    let design = |order| {
        BiquadCascade::design(&FilterSpec::lowpass(
            FilterCharacteristic::Butterworth,
            order,
            350.0,
            FS,
        ))
        .unwrap()
    };

    let order2 = design(2).simulate(&input);
    let order4 = design(4).simulate(&input);

    let e_in = high_band_energy(&input, 1000.0);
    let e2 = high_band_energy(&order2, 1000.0);
    let e4 = high_band_energy(&order4, 1000.0);
    assert!(e2 < e_in * 1e-3, "order 2 high band {} of {}", e2, e_in);
    assert!(e4 < e2 * 0.1, "order 4 {} vs order 2 {}", e4, e2);
}

#[test]
fn test_fir_lowpass_is_linear_phase_and_passes_beats() {
    let fir = FirFilter::design(FirResponse::Lowpass { cutoff_hz: 1000.0 }, FS, 256).unwrap();
    let taps = fir.taps();
    for i in 0..taps.len() / 2 {
        assert_abs_diff_eq!(taps[i], taps[taps.len() - 1 - i], epsilon = 1e-12);
    }

    // 60 Hz passes, 6 kHz is removed
    let low = sine(0.5, 44100, 60.0, 1.0);
    let high = sine(0.5, 44100, 6000.0, 1.0);
    let settle = fir.num_taps();
    let low_out = fir.simulate(&low);
    let high_out = fir.simulate(&high);
    assert!(peak(&low_out[settle..]) > 0.95);
    assert!(peak(&high_out[settle..]) < 0.01);
}
