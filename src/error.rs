use thiserror::Error;

#[derive(Error, Debug)]
pub enum TempoError {
    #[error("Invalid filter specification: {0}")]
    InvalidFilterSpec(String),

    #[error("FFT size must be a power of two greater than 1, got {0}")]
    InvalidFftSize(usize),

    #[error("Invalid tempo range: {min}-{max} BPM (max must be at least twice min)")]
    InvalidTempoRange { min: f64, max: f64 },

    #[error("No beats detected: insufficient signal to estimate tempo")]
    NoBeatsDetected,

    #[error("Tempo search cancelled")]
    Cancelled,

    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),
}

pub type Result<T> = std::result::Result<T, TempoError>;
