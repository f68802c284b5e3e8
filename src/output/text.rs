use super::{BeatOutput, Formatter};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn bpm_text(bpm: Option<u32>) -> String {
    bpm.map_or("---".to_string(), |b| b.to_string())
}

impl Formatter for TextFormatter {
    fn format(&self, output: &BeatOutput) -> String {
        let smoothed = output
            .smoothed_bpm
            .map_or("-".to_string(), |b| format!("{:.1}", b));
        let seconds = output.stream_ms as f64 / 1000.0;
        if self.verbose {
            format!(
                "Beat at {:>9.3}s: {:>3} BPM (avg: {:>5}) [amp: {:.3}, thr: {:.3}]",
                seconds,
                bpm_text(output.bpm),
                smoothed,
                output.amplitude,
                output.threshold
            )
        } else {
            format!(
                "Beat at {:>9.3}s: {:>3} BPM (avg: {:>5})",
                seconds,
                bpm_text(output.bpm),
                smoothed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_output;
    use super::*;

    #[test]
    fn test_text_format() {
        let line = TextFormatter::new(false).format(&sample_output());
        assert_eq!(line, "Beat at     1.500s: 120 BPM (avg: 119.5)");

        let mut first = sample_output();
        first.bpm = None;
        first.smoothed_bpm = None;
        let verbose = TextFormatter::new(true).format(&first);
        assert!(verbose.contains("--- BPM"));
        assert!(verbose.ends_with("[amp: 0.800, thr: 0.480]"));
    }
}
