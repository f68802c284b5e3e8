use std::borrow::Cow;
use std::sync::atomic::AtomicBool;

use crate::config::{PrefilterConfig, TempoConfig};
use crate::error::{Result, TempoError};
use crate::signal_processing::{BiquadCascade, Filter};

use super::batch::{self, AnalysisResult, TempoEstimate, TempoSettings};

/// Batch analysis with an optional zero-phase prefilter
///
/// The prefilter runs forward and backward over the whole buffer so beat
/// positions are not delayed, keeping `guess` offsets aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct TempoAnalyzer {
    settings: TempoSettings,
    prefilter: Option<PrefilterConfig>,
}

impl TempoAnalyzer {
    /// Analyzer working on the raw signal
    pub fn new(settings: TempoSettings) -> Self {
        Self {
            settings,
            prefilter: None,
        }
    }

    /// Batch settings and prefilter taken from a loaded configuration
    pub fn from_config(config: &TempoConfig) -> Result<Self> {
        let settings = config.batch.settings();
        settings.validate()?;
        let analyzer = Self::new(settings);
        Ok(if config.prefilter.enabled {
            analyzer.with_prefilter(config.prefilter.clone())
        } else {
            analyzer
        })
    }

    pub fn with_prefilter(mut self, prefilter: PrefilterConfig) -> Self {
        self.prefilter = Some(prefilter);
        self
    }

    pub fn settings(&self) -> &TempoSettings {
        &self.settings
    }

    /// Apply the prefilter, if any, at `sample_rate`
    ///
    /// # Errors
    /// `InvalidFilterSpec` when the prefilter does not fit the sample rate.
    pub fn prepare<'a>(&self, data: &'a [f32], sample_rate: f32) -> Result<Cow<'a, [f32]>> {
        match &self.prefilter {
            Some(prefilter) => {
                let cascade = BiquadCascade::design(&prefilter.spec(sample_rate))?;
                log::debug!(
                    "Prefiltering {} samples with {} {} order {} at {} Hz",
                    data.len(),
                    prefilter.characteristic,
                    prefilter.kind,
                    prefilter.order,
                    prefilter.cutoff_hz
                );
                Ok(Cow::Owned(cascade.filtfilt(data)))
            }
            None => Ok(Cow::Borrowed(data)),
        }
    }

    pub fn estimate(&self, data: &[f32], sample_rate: f32) -> Result<TempoEstimate> {
        let prepared = self.prepare(data, sample_rate)?;
        batch::estimate_tempo(&prepared, sample_rate, &self.settings)
    }

    pub fn estimate_cancellable(
        &self,
        data: &[f32],
        sample_rate: f32,
        cancel: &AtomicBool,
    ) -> Result<TempoEstimate> {
        let prepared = self.prepare(data, sample_rate)?;
        batch::estimate_tempo_cancellable(&prepared, sample_rate, &self.settings, cancel)
    }

    /// Tempo without phase
    pub fn analyze(&self, data: &[f32], sample_rate: f32) -> Result<AnalysisResult> {
        let estimate = self.estimate(data, sample_rate)?;
        Ok(AnalysisResult {
            bpm: estimate.bpm,
            tempo: estimate.tempo,
            offset: None,
        })
    }

    /// Tempo and first-beat offset
    pub fn guess(&self, data: &[f32], sample_rate: f32) -> Result<AnalysisResult> {
        let estimate = self.estimate(data, sample_rate)?;
        Ok(batch::with_offset(&estimate, sample_rate))
    }

    /// Guess from separate channel buffers, averaged to mono
    pub fn guess_channels(&self, channels: &[&[f32]], sample_rate: f32) -> Result<AnalysisResult> {
        let mono = downmix(channels)?;
        self.guess(&mono, sample_rate)
    }
}

/// Average equal-length channel buffers into one
///
/// # Errors
/// `InsufficientData` when no channels are given or their lengths differ.
pub fn downmix(channels: &[&[f32]]) -> Result<Vec<f32>> {
    let Some(first) = channels.first() else {
        return Err(TempoError::InsufficientData {
            needed: 1,
            available: 0,
        });
    };
    if let Some(short) = channels.iter().find(|c| c.len() != first.len()) {
        return Err(TempoError::InsufficientData {
            needed: first.len(),
            available: short.len(),
        });
    }

    let scale = 1.0 / channels.len() as f32;
    Ok((0..first.len())
        .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
        .collect())
}
