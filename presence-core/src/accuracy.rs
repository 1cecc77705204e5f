//! Majority vote over the distance history.
//!
//! Every sample in the window votes either "near" (at or below the power-on
//! threshold) or "far". The power state only changes once the votes for the
//! opposite state reach the required accuracy.

use crate::{config::Config, history::DistanceHistory, Centimeters};

/// Which power state transition a criterion is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Count "near" votes
    PowerOn,
    /// Count "far" votes
    PowerOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Votes {
    pub near: usize,
    pub far: usize,
}

impl Votes {
    pub fn count<const N: usize>(history: &DistanceHistory<N>, threshold: Centimeters) -> Self {
        let near = history.count_near(threshold);
        Self {
            near,
            far: history.len() - near,
        }
    }

    /// Fraction of votes in favor of `target`, or `None` if there are no votes.
    pub fn fraction(&self, target: Target) -> Option<f32> {
        let total = self.near + self.far;
        if total == 0 {
            return None;
        }
        let matching = match target {
            Target::PowerOn => self.near,
            Target::PowerOff => self.far,
        };
        Some(matching as f32 / total as f32)
    }
}

/// Return whether enough samples agree to switch towards `target`.
pub fn matches_criteria<const N: usize>(
    history: &DistanceHistory<N>,
    target: Target,
    config: &Config,
) -> bool {
    Votes::count(history, config.power_on_threshold_cm)
        .fraction(target)
        .map_or(false, |fraction| fraction >= config.required_accuracy)
}
