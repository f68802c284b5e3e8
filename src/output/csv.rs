use super::{BeatOutput, Formatter, iso8601_timestamp};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, output: &BeatOutput) -> String {
        let bpm = output.bpm.map_or(String::new(), |b| b.to_string());
        let smoothed = output
            .smoothed_bpm
            .map_or(String::new(), |b| format!("{:.2}", b));
        format!(
            "{},{},{},{},{:.4},{:.4}",
            iso8601_timestamp(),
            output.stream_ms,
            bpm,
            smoothed,
            output.amplitude,
            output.threshold
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,stream_ms,bpm,smoothed_bpm,amplitude,threshold")
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_output;
    use super::*;

    #[test]
    fn test_csv_columns_match_header() {
        let formatter = CsvFormatter;
        let line = formatter.format(&sample_output());
        let header = formatter.header().unwrap();
        assert_eq!(line.split(',').count(), header.split(',').count());
        assert!(line.ends_with(",1500,120,119.50,0.8000,0.4800"));
    }
}
