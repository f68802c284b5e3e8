//! Whole-buffer tempo estimation
//!
//! Peaks are picked at descending relative thresholds until enough are found.
//! Distances from each peak to its next few peaks form an interval histogram;
//! every interval becomes a tempo folded into `[min_tempo, max_tempo)`, and
//! nearby tempos reinforce each other. The best-scoring tempo wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::constants::{
    DEFAULT_MAX_TEMPO, DEFAULT_MIN_TEMPO, INITIAL_THRESHOLD, INTERVAL_LOOKAHEAD,
    MAX_PEAK_SKIP_SECS, MIN_PEAK_COUNT, MINIMUM_THRESHOLD, PEAK_SKIP_SECS, TEMPO_MERGE_RADIUS,
    THRESHOLD_STEP,
};
use crate::error::{Result, TempoError};

/// Tuning for the batch estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSettings {
    /// Lower bound of the folded tempo range in BPM
    pub min_tempo: f64,
    /// Upper bound (exclusive) of the folded tempo range in BPM
    pub max_tempo: f64,
    /// Following peaks paired with each peak in the interval histogram
    pub interval_lookahead: usize,
    /// Peak count that ends the threshold search
    pub min_peak_count: usize,
    /// Scan gap after each detected peak, in seconds
    pub peak_skip_secs: f64,
}

impl TempoSettings {
    /// Settings for a tempo range with default tuning
    ///
    /// # Errors
    /// Returns `TempoError::InvalidTempoRange` unless `min > 0` and the range
    /// spans at least one octave.
    pub fn new(min_tempo: f64, max_tempo: f64) -> Result<Self> {
        let settings = Self {
            min_tempo,
            max_tempo,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let range_ok = self.min_tempo > 0.0
            && self.max_tempo.is_finite()
            && self.max_tempo >= 2.0 * self.min_tempo;
        if !range_ok {
            return Err(TempoError::InvalidTempoRange {
                min: self.min_tempo,
                max: self.max_tempo,
            });
        }
        if self.interval_lookahead == 0
            || !(0.0..=MAX_PEAK_SKIP_SECS).contains(&self.peak_skip_secs)
        {
            return Err(TempoError::Config(format!(
                "interval lookahead must be positive and peak skip within 0-{} s (got {}, {})",
                MAX_PEAK_SKIP_SECS, self.interval_lookahead, self.peak_skip_secs
            )));
        }
        Ok(())
    }

    /// Fold a tempo into `[min_tempo, max_tempo)` by octaves
    ///
    /// Non-finite or non-positive tempos have no octave and come back as-is.
    pub fn fold(&self, mut tempo: f64) -> f64 {
        if !(tempo.is_finite() && tempo > 0.0) || self.validate().is_err() {
            return tempo;
        }
        while tempo < self.min_tempo {
            tempo *= 2.0;
        }
        while tempo >= self.max_tempo {
            tempo /= 2.0;
        }
        tempo
    }

    /// Round a folded tempo to whole BPM, staying inside the range
    pub fn round_bpm(&self, tempo: f64) -> u32 {
        let lowest = self.min_tempo.ceil();
        let highest = (self.max_tempo.ceil() - 1.0).max(lowest);
        tempo.round().clamp(lowest, highest) as u32
    }
}

impl Default for TempoSettings {
    fn default() -> Self {
        Self {
            min_tempo: DEFAULT_MIN_TEMPO,
            max_tempo: DEFAULT_MAX_TEMPO,
            interval_lookahead: INTERVAL_LOOKAHEAD,
            min_peak_count: MIN_PEAK_COUNT,
            peak_skip_secs: PEAK_SKIP_SECS,
        }
    }
}

/// Histogram bucket: how often a peak-to-peak distance occurred
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalCount {
    /// Distance in samples
    pub interval: usize,
    pub count: usize,
    /// Sample indices of the peaks each occurrence started from
    pub peaks: Vec<usize>,
}

/// A folded tempo with its accumulated score
#[derive(Debug, Clone, PartialEq)]
pub struct TempoCandidate {
    pub tempo: f64,
    pub score: f64,
    pub peaks: Vec<usize>,
}

/// Winning candidate of an estimate
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    /// Folded tempo before rounding
    pub tempo: f64,
    pub bpm: u32,
    pub score: f64,
    /// Supporting peak indices, ascending
    pub peaks: Vec<usize>,
}

/// Result returned to callers of `analyze` and `guess`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub bpm: u32,
    pub tempo: f64,
    /// Phase of the first beat in seconds, below one beat period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

/// Peaks strictly above `threshold`, skipping `skip` samples after each
pub fn find_peaks(data: &[f32], threshold: f32, skip: usize) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if data[i] > threshold {
            peaks.push(i);
            i = i.saturating_add(skip);
        }
        i = i.saturating_add(1);
    }
    peaks
}

/// Relative thresholds tried by the search, highest first
pub fn threshold_levels() -> impl Iterator<Item = f64> {
    let steps = ((INITIAL_THRESHOLD - MINIMUM_THRESHOLD) / THRESHOLD_STEP).round() as usize;
    (0..=steps).map(|i| INITIAL_THRESHOLD - THRESHOLD_STEP * i as f64)
}

/// Lower the threshold until at least `min_peak_count` peaks are found
///
/// Falls back to the peaks of the lowest level. The search checks `cancel`
/// before each level.
pub fn find_peaks_adaptive(
    data: &[f32],
    sample_rate: f32,
    settings: &TempoSettings,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<usize>> {
    let max = data
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Err(TempoError::NoBeatsDetected);
    }

    let skip = (settings.peak_skip_secs * sample_rate as f64) as usize;
    let mut peaks = Vec::new();
    for level in threshold_levels() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(TempoError::Cancelled);
        }

        peaks = find_peaks(data, max * level as f32, skip);
        log::trace!("Threshold level {:.2}: {} peaks", level, peaks.len());
        if peaks.len() >= settings.min_peak_count {
            log::debug!(
                "Peak search settled at level {:.2} with {} peaks",
                level,
                peaks.len()
            );
            break;
        }
    }

    if peaks.is_empty() {
        return Err(TempoError::NoBeatsDetected);
    }
    Ok(peaks)
}

/// Histogram of distances from each peak to its next `lookahead` peaks
///
/// Buckets keep first-seen order.
pub fn count_intervals(peaks: &[usize], lookahead: usize) -> Vec<IntervalCount> {
    let mut counts: Vec<IntervalCount> = Vec::new();
    let mut index: HashMap<usize, usize> = HashMap::new();

    for (i, &start) in peaks.iter().enumerate() {
        for &next in peaks.iter().skip(i + 1).take(lookahead) {
            let interval = next - start;
            match index.get(&interval) {
                Some(&slot) => {
                    counts[slot].count += 1;
                    counts[slot].peaks.push(start);
                }
                None => {
                    index.insert(interval, counts.len());
                    counts.push(IntervalCount {
                        interval,
                        count: 1,
                        peaks: vec![start],
                    });
                }
            }
        }
    }
    counts
}

/// Convert intervals to folded tempos and score them
///
/// Equal tempos are grouped with summed counts. Each group then gains
/// `count * (1 - 2|delta|)` from every other group within the merge radius,
/// and takes on that group's peaks. A non-positive or non-finite sample rate
/// yields no candidates.
pub fn group_by_tempo(
    intervals: &[IntervalCount],
    sample_rate: f32,
    settings: &TempoSettings,
) -> Vec<TempoCandidate> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Vec::new();
    }
    let mut groups: Vec<TempoCandidate> = Vec::new();
    for bucket in intervals.iter().filter(|b| b.interval > 0) {
        let tempo = settings.fold(60.0 * sample_rate as f64 / bucket.interval as f64);
        match groups.iter_mut().find(|g| g.tempo == tempo) {
            Some(group) => {
                group.score += bucket.count as f64;
                group.peaks.extend_from_slice(&bucket.peaks);
            }
            None => groups.push(TempoCandidate {
                tempo,
                score: bucket.count as f64,
                peaks: bucket.peaks.clone(),
            }),
        }
    }

    let mut candidates = groups.clone();
    for (i, candidate) in candidates.iter_mut().enumerate() {
        for (j, other) in groups.iter().enumerate() {
            let delta = (other.tempo - candidate.tempo).abs();
            if i != j && delta < TEMPO_MERGE_RADIUS {
                candidate.score += other.score * (1.0 - 2.0 * delta);
                candidate.peaks.extend_from_slice(&other.peaks);
            }
        }
        candidate.peaks.sort_unstable();
        candidate.peaks.dedup();
    }
    candidates
}

/// Estimate the dominant tempo of `data`
///
/// # Errors
/// `NoBeatsDetected` when the buffer has no positive peaks or too few to
/// form an interval; `InvalidTempoRange` for bad settings.
pub fn estimate_tempo(
    data: &[f32],
    sample_rate: f32,
    settings: &TempoSettings,
) -> Result<TempoEstimate> {
    estimate(data, sample_rate, settings, None)
}

/// Like `estimate_tempo`, abandoning the search with `Cancelled` once
/// `cancel` is set
pub fn estimate_tempo_cancellable(
    data: &[f32],
    sample_rate: f32,
    settings: &TempoSettings,
    cancel: &AtomicBool,
) -> Result<TempoEstimate> {
    estimate(data, sample_rate, settings, Some(cancel))
}

pub(crate) fn estimate(
    data: &[f32],
    sample_rate: f32,
    settings: &TempoSettings,
    cancel: Option<&AtomicBool>,
) -> Result<TempoEstimate> {
    settings.validate()?;
    if !(sample_rate > 0.0) {
        return Err(TempoError::Config(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }

    let peaks = find_peaks_adaptive(data, sample_rate, settings, cancel)?;
    let intervals = count_intervals(&peaks, settings.interval_lookahead);
    let candidates = group_by_tempo(&intervals, sample_rate, settings);

    let best = candidates
        .into_iter()
        .fold(None::<TempoCandidate>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
        .ok_or(TempoError::NoBeatsDetected)?;

    let bpm = settings.round_bpm(best.tempo);
    log::debug!(
        "Tempo estimate {:.3} BPM ({} BPM), score {:.2}, {} peaks",
        best.tempo,
        bpm,
        best.score,
        best.peaks.len()
    );
    Ok(TempoEstimate {
        tempo: best.tempo,
        bpm,
        score: best.score,
        peaks: best.peaks,
    })
}

/// Tempo of `data` without phase information
pub fn analyze(data: &[f32], sample_rate: f32, settings: &TempoSettings) -> Result<AnalysisResult> {
    let estimate = estimate_tempo(data, sample_rate, settings)?;
    Ok(AnalysisResult {
        bpm: estimate.bpm,
        tempo: estimate.tempo,
        offset: None,
    })
}

/// Tempo of `data` plus the offset of the first beat
pub fn guess(data: &[f32], sample_rate: f32, settings: &TempoSettings) -> Result<AnalysisResult> {
    let estimate = estimate_tempo(data, sample_rate, settings)?;
    Ok(with_offset(&estimate, sample_rate))
}

pub(crate) fn with_offset(estimate: &TempoEstimate, sample_rate: f32) -> AnalysisResult {
    let offset = estimate.peaks.first().map(|&first| {
        let period = 60.0 / estimate.bpm as f64;
        let start = first as f64 / sample_rate as f64;
        start - (start / period).floor() * period
    });
    AnalysisResult {
        bpm: estimate.bpm,
        tempo: estimate.tempo,
        offset,
    }
}
