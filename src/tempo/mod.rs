//! Beat detection and tempo estimation
//!
//! Two paths share the same vocabulary:
//! - [`BeatDetector`] is causal and reports beats sample by sample.
//! - [`estimate_tempo`], [`analyze`] and [`guess`] look at a whole buffer and
//!   return one tempo, optionally with the phase of the first beat.

pub mod analyzer;
pub mod batch;
pub mod stream;

pub use analyzer::{TempoAnalyzer, downmix};
pub use batch::{
    AnalysisResult, IntervalCount, TempoCandidate, TempoEstimate, TempoSettings, analyze,
    count_intervals, estimate_tempo, estimate_tempo_cancellable, find_peaks, group_by_tempo,
    guess,
};
pub use stream::{BeatDetector, BeatEvents, PeakEvent};
