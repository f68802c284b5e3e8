mod csv;
mod json;
mod text;

use chrono::Utc;

use crate::tempo::PeakEvent;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One detected beat as reported to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatOutput {
    /// Stream position of the beat
    pub stream_ms: u64,
    pub bpm: Option<u32>,
    pub smoothed_bpm: Option<f32>,
    pub amplitude: f32,
    pub threshold: f32,
}

impl BeatOutput {
    pub fn new(event: &PeakEvent, smoothed_bpm: Option<f32>) -> Self {
        Self {
            stream_ms: event.timestamp_ms,
            bpm: event.bpm,
            smoothed_bpm,
            amplitude: event.amplitude,
            threshold: event.threshold,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, output: &BeatOutput) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
