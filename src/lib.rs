pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod output;
pub mod processing;
pub mod signal_processing;
pub mod tempo;
pub mod wav;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::TempoConfig;
pub use error::{Result, TempoError};
pub use processing::BeatProcessor;
pub use tempo::{AnalysisResult, BeatDetector, PeakEvent, TempoAnalyzer, TempoSettings};
pub use wav::{WavEncoding, save_wav};
