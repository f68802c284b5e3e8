use crate::config::{AudioConfig, TempoConfig};
use crate::error::{Result, TempoError};
use crate::signal_processing::{BiquadCascade, Filter};
use crate::tempo::{BeatDetector, PeakEvent};

/// Live beat pipeline over interleaved buffers
///
/// Each buffer goes through channel selection, the causal prefilter and the
/// streaming beat detector. Detector and filter state carry across calls.
pub struct BeatProcessor {
    detector: BeatDetector,
    prefilter: Option<BiquadCascade>,
    audio_config: AudioConfig,
    channels: usize,
    beat_buf: Vec<f32>,
}

impl BeatProcessor {
    /// Pipeline for the sample rate and channel count in `config.audio`
    pub fn new(config: &TempoConfig) -> Result<Self> {
        Self::with_format(
            config,
            config.audio.sample_rate,
            config.audio.channels as usize,
        )
    }

    /// Pipeline for input whose format differs from the configured one,
    /// such as a WAV file
    pub fn with_format(config: &TempoConfig, sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(TempoError::Config(format!(
                "invalid input format: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        let fs = sample_rate as f32;

        let prefilter = if config.prefilter.enabled {
            let cascade = BiquadCascade::design(&config.prefilter.spec(fs))?;
            log::info!(
                "Prefilter: {} {} order {} at {} Hz ({} sections)",
                config.prefilter.characteristic,
                config.prefilter.kind,
                config.prefilter.order,
                config.prefilter.cutoff_hz,
                cascade.sections().len()
            );
            Some(cascade)
        } else {
            None
        };

        Ok(Self {
            detector: BeatDetector::new(&config.stream, fs),
            prefilter,
            audio_config: config.audio.clone(),
            channels,
            beat_buf: Vec::new(),
        })
    }

    /// Process one interleaved buffer and return the beats it contains
    pub fn process_audio(&mut self, interleaved: &[f32]) -> Vec<PeakEvent> {
        self.beat_buf = self
            .audio_config
            .extract_channel(interleaved, self.channels);

        if let Some(ref mut cascade) = self.prefilter {
            cascade.process_buffer(&mut self.beat_buf);
        }

        self.detector.process_buffer(&self.beat_buf)
    }

    /// Process a long recording in `buffer_size` chunks, as live input would
    /// arrive
    pub fn process_signal(&mut self, interleaved: &[f32]) -> Vec<PeakEvent> {
        let chunk_size = self.audio_config.buffer_size.max(1) * self.channels;
        let mut all_events = Vec::new();
        for chunk in interleaved.chunks(chunk_size) {
            all_events.extend(self.process_audio(chunk));
        }
        all_events
    }

    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    pub fn smoothed_bpm(&self) -> Option<f32> {
        self.detector.smoothed_bpm()
    }

    /// Filtered beat channel of the most recent buffer
    pub fn filtered_beat(&self) -> &[f32] {
        &self.beat_buf
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        if let Some(ref mut cascade) = self.prefilter {
            cascade.reset();
        }
        self.beat_buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelRole;

    fn stereo_clicks(interval: usize, count: usize, on_right: bool) -> Vec<f32> {
        let mut data = vec![0.0; interval * count * 2];
        for frame in (0..interval * count).step_by(interval) {
            data[frame * 2 + usize::from(on_right)] = 1.0;
        }
        data
    }

    fn raw_config() -> TempoConfig {
        let mut config = TempoConfig::default();
        config.prefilter.enabled = false;
        config
    }

    #[test]
    fn test_chunked_processing_matches_single_pass() {
        let data = stereo_clicks(22050, 5, false);
        let config = raw_config();

        let mut chunked = BeatProcessor::new(&config).unwrap();
        let mut whole = BeatProcessor::new(&config).unwrap();
        let a = chunked.process_signal(&data);
        let b = whole.process_audio(&data);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a[4].bpm, Some(120));
    }

    #[test]
    fn test_channel_selection() {
        let data = stereo_clicks(22050, 3, true);
        let mut config = raw_config();

        let mut left = BeatProcessor::new(&config).unwrap();
        assert!(left.process_signal(&data).is_empty());

        config.audio.beat_channel = ChannelRole::Right;
        let mut right = BeatProcessor::new(&config).unwrap();
        assert_eq!(right.process_signal(&data).len(), 3);
    }

    #[test]
    fn test_prefiltered_stream_keeps_tempo() {
        let mut data = vec![0.0f32; 44100 * 6 * 2];
        for start in (0..44100 * 6).step_by(22050) {
            for n in 0..2000 {
                let t = n as f32 / 44100.0;
                let value = (2.0 * std::f32::consts::PI * 60.0 * t).sin() * (-t * 60.0).exp();
                data[(start + n) * 2] = value;
            }
        }
        let mut processor = BeatProcessor::new(&TempoConfig::default()).unwrap();
        let events = processor.process_signal(&data);
        assert!(events.len() >= 10, "{} events", events.len());
        assert!(events.iter().skip(2).all(|e| e.bpm == Some(120)));
    }

    #[test]
    fn test_invalid_format() {
        assert!(BeatProcessor::with_format(&TempoConfig::default(), 0, 2).is_err());
        assert!(BeatProcessor::with_format(&TempoConfig::default(), 44100, 0).is_err());
    }

    #[test]
    fn test_reset() {
        let data = stereo_clicks(22050, 2, false);
        let mut processor = BeatProcessor::new(&raw_config()).unwrap();
        processor.process_signal(&data);
        processor.reset();
        assert_eq!(processor.detector().samples_processed(), 0);
        assert!(processor.filtered_beat().is_empty());
    }
}
