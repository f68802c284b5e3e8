use std::collections::VecDeque;

/// Maximum over the trailing `W` values of a stream
///
/// Monotonic deque of `(index, value)` pairs, non-increasing from front to
/// back: each `add` drops back entries the new value dominates, pushes it,
/// and expires the front once it leaves the window. Amortized O(1); the
/// deque holds at most `W + 1` entries and is allocated up front.
#[derive(Debug, Clone)]
pub struct SlidingWindowMax<T: Copy> {
    window: usize,
    deque: VecDeque<(u64, T)>,
    index: u64,
    lower_than: fn(T, T) -> bool,
    wait_full_range: bool,
}

impl<T: Copy + PartialOrd> SlidingWindowMax<T> {
    /// Window of `window` values compared with `<`
    ///
    /// With `wait_full_range`, `add` returns `None` until `window` values have
    /// been seen; otherwise it reports the max of the partial window.
    pub fn new(window: usize, wait_full_range: bool) -> Self {
        Self::with_comparator(window, wait_full_range, |a, b| a < b)
    }
}

impl<T: Copy> SlidingWindowMax<T> {
    /// Window ordered by a custom "lower than" predicate
    pub fn with_comparator(
        window: usize,
        wait_full_range: bool,
        lower_than: fn(T, T) -> bool,
    ) -> Self {
        let window = window.max(1);
        Self {
            window,
            deque: VecDeque::with_capacity(window + 1),
            index: 0,
            lower_than,
            wait_full_range,
        }
    }

    /// Insert `value` and return the current window maximum
    pub fn add(&mut self, value: T) -> Option<T> {
        while let Some(&(_, back)) = self.deque.back() {
            if (self.lower_than)(back, value) {
                self.deque.pop_back();
            } else {
                break;
            }
        }
        self.deque.push_back((self.index, value));

        let oldest = (self.index + 1).saturating_sub(self.window as u64);
        while let Some(&(front_index, _)) = self.deque.front() {
            if front_index < oldest {
                self.deque.pop_front();
            } else {
                break;
            }
        }

        let seen = self.index + 1;
        self.index += 1;

        if self.wait_full_range && seen < self.window as u64 {
            return None;
        }
        self.max()
    }

    /// Current maximum without inserting
    pub fn max(&self) -> Option<T> {
        self.deque.front().map(|&(_, v)| v)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Total number of values added
    pub fn count(&self) -> u64 {
        self.index
    }

    pub fn reset(&mut self) {
        self.deque.clear();
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(values: &[f32], i: usize, window: usize) -> f32 {
        let start = (i + 1).saturating_sub(window);
        values[start..=i]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max)
    }

    fn sequence(len: usize) -> Vec<f32> {
        // Deterministic mix of rises, falls and repeats
        (0..len)
            .map(|i| (((i * 37 + 11) % 23) as f32 - 7.0) * if i % 4 == 0 { 0.5 } else { 1.0 })
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let values = sequence(500);
        for window in [1, 2, 3, 7, 50, 499, 500, 800] {
            let mut max = SlidingWindowMax::new(window, false);
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(
                    max.add(v),
                    Some(brute_force(&values, i, window)),
                    "window {} index {}",
                    window,
                    i
                );
            }
        }
    }

    #[test]
    fn test_wait_full_range() {
        let values = sequence(100);
        let window = 10;
        let mut max = SlidingWindowMax::new(window, true);
        for (i, &v) in values.iter().enumerate() {
            let got = max.add(v);
            if i + 1 < window {
                assert_eq!(got, None, "index {}", i);
            } else {
                assert_eq!(got, Some(brute_force(&values, i, window)));
            }
        }
    }

    #[test]
    fn test_deque_stays_within_capacity() {
        let mut max = SlidingWindowMax::new(16, false);
        // Strictly decreasing input keeps every entry until it expires.
        for i in 0..1000 {
            max.add(-(i as f32));
            assert!(max.deque.len() <= 16);
        }
        assert_eq!(max.max(), Some(-984.0));
    }

    #[test]
    fn test_custom_comparator_tracks_minimum() {
        let mut min = SlidingWindowMax::with_comparator(3, false, |a: i32, b: i32| a > b);
        assert_eq!(min.add(5), Some(5));
        assert_eq!(min.add(3), Some(3));
        assert_eq!(min.add(4), Some(3));
        assert_eq!(min.add(6), Some(3));
        assert_eq!(min.add(7), Some(4));
    }

    #[test]
    fn test_reset() {
        let mut max = SlidingWindowMax::new(4, true);
        max.add(1.0f32);
        max.add(2.0);
        max.reset();
        assert_eq!(max.count(), 0);
        assert_eq!(max.add(0.5), None);
    }
}
