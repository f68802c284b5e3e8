/// Common trait for streaming filters
///
/// Implemented by `BiquadCascade` and `FirFilter`. Each implementor owns its
/// delay-line state; `reset` clears that state and leaves coefficients alone.
pub trait Filter {
    /// Process a single sample through the filter
    fn process(&mut self, sample: f32) -> f32;

    /// Zero the filter state without touching coefficients
    fn reset(&mut self);

    /// Process a buffer of samples in-place
    fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Run `input` through a copy of the filter, leaving `self` untouched
    ///
    /// The copy starts from the current state, so the output is what
    /// `process_buffer` would produce if called now.
    fn simulate(&self, input: &[f32]) -> Vec<f32>
    where
        Self: Clone,
    {
        let mut scratch = self.clone();
        let mut output = input.to_vec();
        scratch.process_buffer(&mut output);
        output
    }

    /// Zero-phase filtering: forward pass, reverse, second pass from a
    /// freshly reset state, reverse again
    fn filtfilt(&self, input: &[f32]) -> Vec<f32>
    where
        Self: Clone,
    {
        let mut scratch = self.clone();
        scratch.reset();
        let mut output = input.to_vec();
        scratch.process_buffer(&mut output);

        output.reverse();
        scratch.reset();
        scratch.process_buffer(&mut output);
        output.reverse();
        output
    }

    /// Response of a freshly reset copy to a unit impulse
    fn impulse_response(&self, len: usize) -> Vec<f32>
    where
        Self: Clone,
    {
        let mut scratch = self.clone();
        scratch.reset();
        (0..len)
            .map(|i| scratch.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect()
    }
}
