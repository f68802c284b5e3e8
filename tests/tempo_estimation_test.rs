use approx::assert_abs_diff_eq;
use std::sync::atomic::AtomicBool;

use tempotrack::TempoError;
use tempotrack::config::TempoConfig;
use tempotrack::simulation::{NoiseConfig, apply_noise, kick_train, mix, pulse_train, sine};
use tempotrack::tempo::{
    TempoAnalyzer, TempoSettings, analyze, count_intervals, estimate_tempo_cancellable,
    find_peaks, group_by_tempo, guess,
};

const SAMPLE_RATE: u32 = 44100;
const FS: f32 = SAMPLE_RATE as f32;

#[test]
fn test_guess_120_bpm_pulse_train() {
    let offset = 0.1;
    let signal = pulse_train(15.0, SAMPLE_RATE, 120.0, offset, 1.0);

    let result = guess(&signal, FS, &TempoSettings::default()).unwrap();

    assert_eq!(result.bpm, 120);
    let measured = result.offset.unwrap();
    assert!(
        (measured - offset as f64).abs() <= 1.0 / FS as f64,
        "offset {} expected {}",
        measured,
        offset
    );
}

#[test]
fn test_silence_reports_no_beats() {
    let silence = vec![0.0f32; SAMPLE_RATE as usize * 5];
    let err = guess(&silence, FS, &TempoSettings::default()).unwrap_err();
    assert!(matches!(err, TempoError::NoBeatsDetected));

    let negative_only = vec![-0.5f32; 1000];
    assert!(matches!(
        analyze(&negative_only, FS, &TempoSettings::default()),
        Err(TempoError::NoBeatsDetected)
    ));
}

#[test]
fn test_fast_train_folds_down() {
    let signal = pulse_train(15.0, SAMPLE_RATE, 240.0, 0.0, 1.0);
    let result = analyze(&signal, FS, &TempoSettings::default()).unwrap();
    assert_eq!(result.bpm, 120);
    assert_eq!(result.offset, None);
}

#[test]
fn test_octave_related_intervals_share_a_bucket() {
    let settings = TempoSettings::default();
    // Pulses at 60, 120 and 240 BPM
    for interval in [44100usize, 22050, 11025] {
        let peaks: Vec<usize> = (0..8).map(|k| k * interval).collect();
        let counts = count_intervals(&peaks, 1);
        let candidates = group_by_tempo(&counts, FS, &settings);
        assert_eq!(candidates.len(), 1);
        assert_abs_diff_eq!(candidates[0].tempo, 120.0, epsilon = 1e-9);
    }
}

#[test]
fn test_tempos_across_range() {
    for bpm in [92.0f32, 100.0, 128.0, 140.0, 174.0] {
        let signal = pulse_train(20.0, SAMPLE_RATE, bpm, 0.05, 0.8);
        let result = analyze(&signal, FS, &TempoSettings::default()).unwrap();
        assert_eq!(result.bpm, bpm as u32, "input {} BPM", bpm);
        assert!(
            (result.tempo - bpm as f64).abs() < 0.5,
            "tempo {} for {} BPM",
            result.tempo,
            bpm
        );
    }
}

#[test]
fn test_peak_search_lowers_threshold_for_quiet_beats() {
    // Alternating loud and quiet beats: the loud ones alone are too few
    let mut signal = vec![0.0f32; SAMPLE_RATE as usize * 20];
    for (k, i) in (0..signal.len()).step_by(22050).enumerate() {
        signal[i] = if k % 2 == 0 { 1.0 } else { 0.5 };
    }
    assert_eq!(find_peaks(&signal, 0.95, 11025).len(), 20);

    let result = analyze(&signal, FS, &TempoSettings::default()).unwrap();
    assert_eq!(result.bpm, 120);
}

#[test]
fn test_prefiltered_kicks_with_noise() {
    let clean = kick_train(20.0, SAMPLE_RATE, 126.0, 0.2);
    let hum = sine(20.0, SAMPLE_RATE, 3000.0, 0.3);
    let period = (60.0 * FS / 126.0).round() as usize;
    let noisy = apply_noise(
        &mix(&clean, &hum),
        &NoiseConfig::default().with_seed(42).with_awgn(20.0),
        period,
    );

    let analyzer = TempoAnalyzer::from_config(&TempoConfig::default()).unwrap();
    let result = analyzer.guess(&noisy, FS).unwrap();
    assert_eq!(result.bpm, 126);
}

#[test]
fn test_dropouts_keep_tempo() {
    let clean = pulse_train(30.0, SAMPLE_RATE, 110.0, 0.0, 1.0);
    let period = (60.0 * FS / 110.0).round() as usize;
    let noisy = apply_noise(
        &clean,
        &NoiseConfig::default().with_seed(7).with_dropout(0.2),
        period,
    );
    let result = analyze(&noisy, FS, &TempoSettings::default()).unwrap();
    assert_eq!(result.bpm, 110);
}

#[test]
fn test_custom_range_from_config() {
    let config = TempoConfig::from_toml_str(
        r#"
        [batch]
        min_tempo = 60.0
        max_tempo = 120.0

        [prefilter]
        enabled = false
        "#,
    )
    .unwrap();
    let signal = pulse_train(15.0, SAMPLE_RATE, 150.0, 0.0, 1.0);
    let result = TempoAnalyzer::from_config(&config)
        .unwrap()
        .analyze(&signal, FS)
        .unwrap();
    assert_eq!(result.bpm, 75);
}

#[test]
fn test_cancellation() {
    let signal = pulse_train(10.0, SAMPLE_RATE, 120.0, 0.0, 1.0);
    let cancel = AtomicBool::new(true);
    assert!(matches!(
        estimate_tempo_cancellable(&signal, FS, &TempoSettings::default(), &cancel),
        Err(TempoError::Cancelled)
    ));
}
