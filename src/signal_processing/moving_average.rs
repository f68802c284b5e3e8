/// Moving average over the last N values
///
/// Used to smooth the instantaneous BPM reported by the streaming detector.
/// The window is a fixed circular buffer with a running sum, so `add` is
/// O(1) and never allocates.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: Vec<f32>,
    index: usize,
    filled: bool,
    sum: f64,
}

impl MovingAverage {
    /// Create a moving average over `window_size` values (at least one)
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: vec![0.0; window_size.max(1)],
            index: 0,
            filled: false,
            sum: 0.0,
        }
    }

    /// Push a value and return the updated average
    pub fn add(&mut self, value: f32) -> f32 {
        self.sum += value as f64 - self.buffer[self.index] as f64;
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();

        if self.index == 0 {
            self.filled = true;
        }

        self.average()
    }

    /// Mean of the values seen so far, or of the full window once filled
    pub fn average(&self) -> f32 {
        let count = self.len().max(1);
        (self.sum / count as f64) as f32
    }

    /// Number of values currently contributing to the average
    pub fn len(&self) -> usize {
        if self.filled {
            self.buffer.len()
        } else {
            self.index
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.filled = false;
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let mut ma = MovingAverage::new(3);

        assert!((ma.add(120.0) - 120.0).abs() < 0.01);
        assert!((ma.add(124.0) - 122.0).abs() < 0.01);
        assert!((ma.add(116.0) - 120.0).abs() < 0.01);
        assert!((ma.add(130.0) - 123.33).abs() < 0.01); // (124+116+130)/3
        assert!((ma.add(130.0) - 125.33).abs() < 0.01); // (116+130+130)/3
    }

    #[test]
    fn test_empty_and_reset() {
        let mut ma = MovingAverage::new(4);
        assert!(ma.is_empty());
        assert_eq!(ma.average(), 0.0);

        ma.add(100.0);
        ma.add(110.0);
        assert_eq!(ma.len(), 2);

        ma.reset();
        assert!(ma.is_empty());
        assert!((ma.add(90.0) - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_window_is_single_value() {
        let mut ma = MovingAverage::new(0);
        ma.add(100.0);
        assert!((ma.add(140.0) - 140.0).abs() < 0.01);
    }
}
