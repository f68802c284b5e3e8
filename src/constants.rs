//! Numeric constants for filter design and tempo inference
//!
//! Defaults shared by the streaming detector and the batch estimator, plus
//! the stability limits applied while designing filters.

/// Largest order accepted by the table-driven biquad designs.
pub const MAX_TABLE_ORDER: usize = 12;

/// Highest per-section center frequency as a fraction of the sample rate.
/// Stage frequencies scaled past this point are clamped to it.
pub const MAX_SECTION_FREQ_RATIO: f64 = 0.49;

/// Q used when a bandpass/bandstop/peak/shelf design is given neither Q nor bandwidth.
pub const DEFAULT_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Epsilon for guarding divisions by near-zero values.
pub const DIVISION_EPSILON: f64 = 1e-12;

/// Adaptive threshold scale applied to the sliding maximum.
pub const DEFAULT_SENSITIVITY: f32 = 0.6;

/// Threshold floor, 5% of full scale for normalized samples.
pub const DEFAULT_MIN_THRESHOLD: f32 = 0.05;

/// Length of the sliding maximum window used by the streaming detector.
pub const DEFAULT_WINDOW_SECS: f32 = 1.5;

/// Upper limit for the streaming window and refractory period.
pub const MAX_STREAM_SECS: f32 = 60.0;

/// Refractory period divisor: `sample_rate / 5` samples, capping at 300 BPM.
pub const MIN_PEAK_DISTANCE_DIVISOR: f32 = 5.0;

/// Lower bound of the folded tempo range in BPM.
pub const DEFAULT_MIN_TEMPO: f64 = 90.0;

/// Upper bound (exclusive) of the folded tempo range in BPM.
pub const DEFAULT_MAX_TEMPO: f64 = 180.0;

/// First relative threshold tried by the batch peak search.
pub const INITIAL_THRESHOLD: f64 = 0.95;

/// Step between relative thresholds in the batch peak search.
pub const THRESHOLD_STEP: f64 = 0.05;

/// Lowest relative threshold tried by the batch peak search.
pub const MINIMUM_THRESHOLD: f64 = 0.2;

/// Peak count at which the batch search stops lowering its threshold.
pub const MIN_PEAK_COUNT: usize = 30;

/// Number of following peaks paired with each peak in the interval histogram.
pub const INTERVAL_LOOKAHEAD: usize = 10;

/// Tempo candidates closer than this (BPM) are merged with a proximity weight.
pub const TEMPO_MERGE_RADIUS: f64 = 0.5;

/// Fraction of a second skipped after each batch peak.
pub const PEAK_SKIP_SECS: f64 = 0.25;

/// Longest accepted batch peak skip; one beat at 12 BPM.
pub const MAX_PEAK_SKIP_SECS: f64 = 5.0;
