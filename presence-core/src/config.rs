//! Compile-time configuration of the switch.

use crate::{errors::Error, Centimeters};

/// Thresholds and timing of the switch. The window size is not part of this
/// struct, it is a const generic parameter of the history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Samples at or below this distance count as "near"
    pub power_on_threshold_cm: Centimeters,
    /// Samples at or above this distance are sensor noise and get ignored
    pub max_valid_distance_cm: Centimeters,
    /// Wall-clock time that the full history window should span
    pub window_period_ms: u32,
    /// Fraction of window votes required to change the power state
    pub required_accuracy: f32,
    /// Added to the threshold to get the value the history starts with
    pub initial_margin_cm: Centimeters,
}

impl Config {
    pub const DEFAULT: Self = Self {
        power_on_threshold_cm: 70,
        max_valid_distance_cm: 120,
        window_period_ms: 500,
        required_accuracy: 0.7,
        initial_margin_cm: 10,
    };

    /// Check the configuration for a history window of `window_size` samples.
    pub fn validate(&self, window_size: usize) -> Result<(), Error> {
        if window_size == 0 || self.window_period_ms == 0 {
            return Err(Error::InvalidWindow);
        }
        if self.power_on_threshold_cm == 0
            || self.power_on_threshold_cm >= self.max_valid_distance_cm
            || self.initial_margin_cm == 0
        {
            return Err(Error::InvalidThreshold);
        }
        // Written this way round so that NaN is rejected as well
        if !(self.required_accuracy > 0.0 && self.required_accuracy <= 1.0) {
            return Err(Error::InvalidAccuracy);
        }
        Ok(())
    }

    /// The value every history slot is initialized with. Always "far".
    pub fn initial_distance_cm(&self) -> Centimeters {
        self.power_on_threshold_cm
            .saturating_add(self.initial_margin_cm)
    }

    /// Whether a raw sensor reading should enter the history at all.
    pub fn is_valid_sample(&self, distance: Centimeters) -> bool {
        distance > 0 && distance < self.max_valid_distance_cm
    }

    /// Delay between two measurements, rounded to the nearest millisecond.
    pub fn sample_period_ms(&self, window_size: usize) -> u32 {
        if window_size == 0 {
            return self.window_period_ms;
        }
        let window_size = window_size as u32;
        (self.window_period_ms + window_size / 2) / window_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
