use serde::Serialize;

use crate::config::StreamConfig;
use crate::signal_processing::{MovingAverage, SlidingWindowMax};

/// A beat accepted by the streaming detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakEvent {
    /// Index of the sample that triggered the beat
    pub sample_index: u64,
    /// Time of the beat since the start of the stream
    pub timestamp_ms: u64,
    /// Instantaneous tempo from the previous beat; `None` for the first
    pub bpm: Option<u32>,
    /// Sample value at the beat
    pub amplitude: f32,
    /// Threshold in effect when the beat fired
    pub threshold: f32,
}

/// Causal beat detector with an adaptive threshold
///
/// The threshold follows a fraction of the largest absolute sample seen in
/// the last few seconds, floored at `min_threshold`. A sample at or above the
/// threshold is a beat once the refractory period since the previous beat has
/// passed.
pub struct BeatDetector {
    sample_rate: f32,
    sensitivity: f32,
    min_threshold: f32,
    min_peak_distance: u64,
    window_max: SlidingWindowMax<f32>,
    /// Samples since the last beat, `None` before the first one
    distance: Option<u64>,
    sample_index: u64,
    threshold: f32,
    last_bpm: Option<u32>,
    smoothed: MovingAverage,
}

impl BeatDetector {
    /// Create a detector for `sample_rate` Hz input
    pub fn new(config: &StreamConfig, sample_rate: f32) -> Self {
        let window = (config.window_secs * sample_rate).round().max(1.0) as usize;
        let min_peak_distance = (config.min_peak_interval_secs * sample_rate).max(0.0) as u64;

        log::debug!(
            "Beat detector: {:.0} Hz, window {} samples, refractory {} samples",
            sample_rate,
            window,
            min_peak_distance
        );

        Self {
            sample_rate,
            sensitivity: config.sensitivity,
            min_threshold: config.min_threshold,
            min_peak_distance,
            window_max: SlidingWindowMax::new(window, false),
            distance: None,
            sample_index: 0,
            threshold: config.min_threshold,
            last_bpm: None,
            smoothed: MovingAverage::new(config.bpm_smoothing),
        }
    }

    /// Feed one sample, returning a beat if it triggers one
    pub fn process_sample(&mut self, sample: f32) -> Option<PeakEvent> {
        let index = self.sample_index;
        self.sample_index += 1;
        if let Some(d) = self.distance.as_mut() {
            *d = d.saturating_add(1);
        }

        let recent_max = self.window_max.add(sample.abs()).unwrap_or(0.0);
        self.threshold = (recent_max * self.sensitivity).max(self.min_threshold);

        let ready = self.distance.is_none_or(|d| d > self.min_peak_distance);
        if !(sample >= self.threshold && ready) {
            return None;
        }

        let bpm = self
            .distance
            .map(|d| (60.0 * self.sample_rate as f64 / d as f64).round() as u32);
        self.distance = Some(0);

        if let Some(bpm) = bpm {
            self.last_bpm = Some(bpm);
            self.smoothed.add(bpm as f32);
        }

        Some(PeakEvent {
            sample_index: index,
            timestamp_ms: (index as f64 * 1000.0 / self.sample_rate as f64) as u64,
            bpm,
            amplitude: sample,
            threshold: self.threshold,
        })
    }

    /// Run a buffer through the detector and collect its beats
    pub fn process_buffer(&mut self, samples: &[f32]) -> Vec<PeakEvent> {
        self.events(samples.iter().copied()).collect()
    }

    /// Lazily detect beats over a sample iterator
    pub fn events<I>(&mut self, samples: I) -> BeatEvents<'_, I::IntoIter>
    where
        I: IntoIterator<Item = f32>,
    {
        BeatEvents {
            detector: self,
            samples: samples.into_iter(),
        }
    }

    /// Threshold after the most recent sample
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn last_bpm(&self) -> Option<u32> {
        self.last_bpm
    }

    /// Moving average of recent instantaneous BPMs
    pub fn smoothed_bpm(&self) -> Option<f32> {
        (!self.smoothed.is_empty()).then(|| self.smoothed.average())
    }

    pub fn samples_processed(&self) -> u64 {
        self.sample_index
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Forget all history, keeping the configuration
    pub fn reset(&mut self) {
        self.window_max.reset();
        self.distance = None;
        self.sample_index = 0;
        self.threshold = self.min_threshold;
        self.last_bpm = None;
        self.smoothed.reset();
    }
}

/// Iterator over the beats a detector finds in a sample stream
pub struct BeatEvents<'a, I> {
    detector: &'a mut BeatDetector,
    samples: I,
}

impl<I: Iterator<Item = f32>> Iterator for BeatEvents<'_, I> {
    type Item = PeakEvent;

    fn next(&mut self) -> Option<PeakEvent> {
        self.samples
            .by_ref()
            .find_map(|s| self.detector.process_sample(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const FS: f32 = 44100.0;

    fn clicks(interval: usize, count: usize) -> Vec<f32> {
        let mut data = vec![0.0; interval * count];
        for i in (0..data.len()).step_by(interval) {
            data[i] = 1.0;
        }
        data
    }

    #[test]
    fn test_click_train_tempo() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        let events = detector.process_buffer(&clicks(22050, 6));

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].bpm, None);
        assert_eq!(events[0].sample_index, 0);
        for event in &events[1..] {
            assert_eq!(event.bpm, Some(120));
        }
        assert_eq!(events[2].timestamp_ms, 1000);
        assert_eq!(detector.last_bpm(), Some(120));
        assert_abs_diff_eq!(detector.smoothed_bpm().unwrap(), 120.0, epsilon = 1e-4);
    }

    #[test]
    fn test_refractory_period() {
        // Clicks every 0.1 s are faster than the 0.2 s refractory period.
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        let events = detector.process_buffer(&clicks(4410, 40));

        assert!(!events.is_empty());
        let min_distance = (FS / 5.0) as u64;
        for pair in events.windows(2) {
            assert!(pair[1].sample_index - pair[0].sample_index > min_distance);
        }
        assert!(events.iter().skip(1).all(|e| e.bpm == Some(200)));
    }

    #[test]
    fn test_quiet_signal_below_floor() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        let quiet: Vec<f32> = clicks(22050, 4).iter().map(|s| s * 0.04).collect();
        assert!(detector.process_buffer(&quiet).is_empty());
        assert_eq!(detector.smoothed_bpm(), None);
        assert_eq!(detector.threshold(), 0.05);
    }

    #[test]
    fn test_threshold_tracks_recent_maximum() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        detector.process_sample(0.8);
        assert_abs_diff_eq!(detector.threshold(), 0.48, epsilon = 1e-6);

        // A smaller click within the window stays under 0.6 of the max.
        let mut data = vec![0.0; 22050];
        data[22049] = 0.4;
        assert!(detector.process_buffer(&data).is_empty());
    }

    #[test]
    fn test_negative_samples_raise_threshold_only() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        assert!(detector.process_sample(-1.0).is_none());
        assert_abs_diff_eq!(detector.threshold(), 0.6, epsilon = 1e-6);
        assert!(detector.process_sample(0.7).is_some());
    }

    #[test]
    fn test_events_iterator_is_lazy() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        let data = clicks(22050, 3);
        let first = detector.events(data.iter().copied()).next();
        assert_eq!(first.map(|e| e.sample_index), Some(0));
        assert_eq!(detector.samples_processed(), 1);
    }

    #[test]
    fn test_reset() {
        let mut detector = BeatDetector::new(&StreamConfig::default(), FS);
        detector.process_buffer(&clicks(22050, 3));
        detector.reset();
        assert_eq!(detector.samples_processed(), 0);
        assert_eq!(detector.last_bpm(), None);
        let events = detector.process_buffer(&clicks(22050, 2));
        assert_eq!(events[0].bpm, None);
        assert_eq!(events[1].bpm, Some(120));
    }
}
