//! Rolling window of the most recent valid distance samples.

use heapless::Deque;

use crate::{config::Config, Centimeters};

/// Fixed-size FIFO of distance samples, oldest first.
///
/// The window is full from construction on: every push evicts the oldest
/// sample, so the length is always `N`.
pub struct DistanceHistory<const N: usize> {
    samples: Deque<Centimeters, N>,
}

impl<const N: usize> DistanceHistory<N> {
    /// Create a history with all `N` slots set to `initial`.
    pub fn new(initial: Centimeters) -> Self {
        let mut samples = Deque::new();
        for _ in 0..N {
            // Cannot fail, we push exactly `N` values
            samples.push_back(initial).ok();
        }
        Self { samples }
    }

    /// Create a history that is biased towards "far".
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.initial_distance_cm())
    }

    /// Append a sample, dropping the oldest one.
    pub fn push(&mut self, sample: Centimeters) {
        if N == 0 {
            return;
        }
        if self.samples.is_full() {
            self.samples.pop_front();
        }
        self.samples.push_back(sample).ok();
    }

    /// Iterate over the samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Centimeters> + '_ {
        self.samples.iter().copied()
    }

    pub fn oldest(&self) -> Option<Centimeters> {
        self.samples.front().copied()
    }

    pub fn newest(&self) -> Option<Centimeters> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples at or below `threshold`.
    pub fn count_near(&self, threshold: Centimeters) -> usize {
        self.iter().filter(|sample| *sample <= threshold).count()
    }
}
