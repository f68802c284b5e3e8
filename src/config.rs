//! Configuration for tempo estimation and live beat detection.
//!
//! Every section has defaults and can be loaded from TOML; missing keys fall
//! back to the defaults:
//!
//! ```toml
//! [audio]
//! beat_channel = "mix"
//!
//! [stream]
//! sensitivity = 0.5
//!
//! [batch]
//! min_tempo = 80.0
//! max_tempo = 160.0
//!
//! [prefilter]
//! characteristic = "bessel"
//! cutoff_hz = 180.0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_MAX_TEMPO, DEFAULT_MIN_TEMPO, DEFAULT_MIN_THRESHOLD, DEFAULT_SENSITIVITY,
    DEFAULT_WINDOW_SECS, INTERVAL_LOOKAHEAD, MAX_STREAM_SECS, MIN_PEAK_COUNT,
    MIN_PEAK_DISTANCE_DIVISOR, PEAK_SKIP_SECS,
};
use crate::error::{Result, TempoError};
use crate::signal_processing::{FilterCharacteristic, FilterKind, FilterSpec};
use crate::tempo::TempoSettings;

/// Folded tempo range in BPM, `min..max`
///
/// # Parsing formats
/// - `90-180` - minimum and maximum BPM
/// - `90..180` - same, range syntax
///
/// # Example
/// ```
/// use tempotrack::config::TempoRange;
///
/// let range: TempoRange = "80-160".parse().unwrap();
/// assert_eq!(range.min, 80.0);
/// assert_eq!(range.max, 160.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRange {
    pub min: f64,
    pub max: f64,
}

impl TempoRange {
    /// Range must be positive and span at least one octave
    pub fn validate(&self) -> Result<()> {
        if !(self.min > 0.0 && self.max.is_finite() && self.max >= 2.0 * self.min) {
            return Err(TempoError::InvalidTempoRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for TempoRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_TEMPO,
            max: DEFAULT_MAX_TEMPO,
        }
    }
}

impl fmt::Display for TempoRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for TempoRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (lo, hi) = s
            .split_once("..")
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| format!("invalid tempo range: {} (expected MIN-MAX)", s))?;

        let min: f64 = lo
            .trim()
            .parse()
            .map_err(|_| format!("invalid minimum tempo: {}", lo))?;
        let max: f64 = hi
            .trim()
            .parse()
            .map_err(|_| format!("invalid maximum tempo: {}", hi))?;

        let range = Self { min, max };
        range.validate().map_err(|e| e.to_string())?;
        Ok(range)
    }
}

/// Which input channel feeds beat detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// Left channel (index 0 in interleaved stereo)
    Left,
    /// Right channel (index 1 in interleaved stereo)
    Right,
    /// Average of all channels
    Mix,
}

/// Complete configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Audio input configuration
    pub audio: AudioConfig,
    /// Streaming beat detector configuration
    pub stream: StreamConfig,
    /// Batch tempo estimator configuration
    pub batch: BatchConfig,
    /// Filter applied ahead of both detectors
    pub prefilter: PrefilterConfig,
}

impl TempoConfig {
    /// Parse TOML, filling missing keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TempoError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TempoError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.stream.validate()?;
        self.batch.settings().validate()?;
        if self.prefilter.enabled {
            self.prefilter
                .spec(self.audio.sample_rate as f32)
                .validate()?;
        }
        Ok(())
    }
}

/// Audio input configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Processing buffer size in frames
    pub buffer_size: usize,
    /// Number of interleaved channels
    pub channels: u16,
    /// Channel used for beat detection
    pub beat_channel: ChannelRole,
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.channels == 0 || self.buffer_size == 0 {
            return Err(TempoError::Config(format!(
                "audio sample_rate, channels and buffer_size must be non-zero (got {}, {}, {})",
                self.sample_rate, self.channels, self.buffer_size
            )));
        }
        Ok(())
    }

    /// Extract the beat channel from interleaved samples
    ///
    /// `Right` on mono input falls back to the only channel.
    pub fn extract_channel(&self, interleaved: &[f32], channels: usize) -> Vec<f32> {
        let channels = channels.max(1);
        match self.beat_channel {
            ChannelRole::Left => interleaved.iter().step_by(channels).copied().collect(),
            ChannelRole::Right => {
                let index = 1.min(channels - 1);
                interleaved
                    .iter()
                    .skip(index)
                    .step_by(channels)
                    .copied()
                    .collect()
            }
            ChannelRole::Mix => interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 1024,
            channels: 2,
            beat_channel: ChannelRole::Left,
        }
    }
}

/// Streaming beat detector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Fraction of the recent maximum a sample must reach, in (0, 1]
    pub sensitivity: f32,
    /// Threshold floor for normalized samples
    pub min_threshold: f32,
    /// Length of the sliding maximum window in seconds
    pub window_secs: f32,
    /// Refractory period after each beat in seconds
    pub min_peak_interval_secs: f32,
    /// Number of beat intervals averaged into the smoothed BPM
    pub bpm_smoothing: usize,
}

impl StreamConfig {
    fn validate(&self) -> Result<()> {
        if !(self.sensitivity > 0.0 && self.sensitivity <= 1.0) {
            return Err(TempoError::Config(format!(
                "stream sensitivity must be in (0, 1], got {}",
                self.sensitivity
            )));
        }
        if !(self.min_threshold >= 0.0) {
            return Err(TempoError::Config(format!(
                "stream min_threshold must be non-negative, got {}",
                self.min_threshold
            )));
        }
        if !(self.window_secs > 0.0 && self.window_secs <= MAX_STREAM_SECS)
            || !(0.0..=MAX_STREAM_SECS).contains(&self.min_peak_interval_secs)
        {
            return Err(TempoError::Config(format!(
                "stream window_secs must be in (0, {max}] and min_peak_interval_secs in [0, {max}] (got {}, {})",
                self.window_secs,
                self.min_peak_interval_secs,
                max = MAX_STREAM_SECS
            )));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            min_threshold: DEFAULT_MIN_THRESHOLD,
            window_secs: DEFAULT_WINDOW_SECS,
            min_peak_interval_secs: 1.0 / MIN_PEAK_DISTANCE_DIVISOR,
            bpm_smoothing: 8,
        }
    }
}

/// Batch tempo estimator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
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

impl BatchConfig {
    pub fn settings(&self) -> TempoSettings {
        TempoSettings {
            min_tempo: self.min_tempo,
            max_tempo: self.max_tempo,
            interval_lookahead: self.interval_lookahead,
            min_peak_count: self.min_peak_count,
            peak_skip_secs: self.peak_skip_secs,
        }
    }

    pub fn set_range(&mut self, range: TempoRange) {
        self.min_tempo = range.min;
        self.max_tempo = range.max;
    }
}

impl Default for BatchConfig {
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

/// Prefilter configuration
///
/// Defaults to a gentle Butterworth lowpass that keeps kick and bass energy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    pub enabled: bool,
    pub kind: FilterKind,
    pub characteristic: FilterCharacteristic,
    pub order: usize,
    pub cutoff_hz: f64,
    pub q: Option<f64>,
    /// Bandwidth in octaves
    pub bandwidth: Option<f64>,
    pub gain_db: Option<f64>,
}

impl PrefilterConfig {
    pub fn spec(&self, sample_rate: f32) -> FilterSpec {
        FilterSpec {
            kind: self.kind,
            characteristic: self.characteristic,
            order: self.order,
            cutoff_hz: self.cutoff_hz,
            sample_rate: sample_rate as f64,
            q: self.q,
            bandwidth: self.bandwidth,
            gain_db: self.gain_db,
        }
    }
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: FilterKind::Lowpass,
            characteristic: FilterCharacteristic::Butterworth,
            order: 1,
            cutoff_hz: 240.0,
            q: None,
            bandwidth: None,
            gain_db: None,
        }
    }
}
