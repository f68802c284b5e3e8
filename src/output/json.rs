use serde::Serialize;

use super::{BeatOutput, Formatter, iso8601_timestamp};

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonBeat {
    ts: String,
    stream_ms: u64,
    bpm: Option<u32>,
    smoothed_bpm: Option<f32>,
    amplitude: f32,
    threshold: f32,
}

impl Formatter for JsonFormatter {
    fn format(&self, output: &BeatOutput) -> String {
        let beat = JsonBeat {
            ts: iso8601_timestamp(),
            stream_ms: output.stream_ms,
            bpm: output.bpm,
            smoothed_bpm: output.smoothed_bpm,
            amplitude: output.amplitude,
            threshold: output.threshold,
        };
        serde_json::to_string(&beat).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_output;
    use super::*;

    #[test]
    fn test_json_line() {
        let mut output = sample_output();
        output.bpm = None;
        let line = JsonFormatter.format(&output);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["stream_ms"], 1500);
        assert!(value["bpm"].is_null());
        assert_eq!(value["smoothed_bpm"], 119.5);
    }
}
