//! Power state machine.
//!
//! Two states, `Off` and `On`. In each state only the criterion for leaving
//! it is evaluated, so there is at most one transition per sample.

use crate::{
    accuracy::{matches_criteria, Target},
    config::Config,
    history::DistanceHistory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    /// Determine the state following `self` for the given history.
    pub fn next<const N: usize>(self, history: &DistanceHistory<N>, config: &Config) -> Self {
        match self {
            Self::Off if matches_criteria(history, Target::PowerOn, config) => Self::On,
            Self::On if matches_criteria(history, Target::PowerOff, config) => Self::Off,
            unchanged => unchanged,
        }
    }

    pub fn is_on(&self) -> bool {
        *self == Self::On
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }
}

impl Default for PowerState {
    fn default() -> Self {
        Self::Off
    }
}

impl ufmt::uDisplay for PowerState {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

/// A change of the power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PowerState,
    pub to: PowerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_on {
        ($state:expr) => {{
            assert!($state.is_on());
            assert_eq!($state, PowerState::On);
        }};
    }

    macro_rules! assert_off {
        ($state:expr) => {{
            assert!(!$state.is_on());
            assert_eq!($state, PowerState::Off);
        }};
    }

    fn fill<const N: usize>(history: &mut DistanceHistory<N>, sample: u32, count: usize) {
        for _ in 0..count {
            history.push(sample);
        }
    }

    #[test]
    fn test_initial_state() {
        let config = Config::DEFAULT;
        let history = DistanceHistory::<20>::from_config(&config);
        assert_off!(PowerState::default());
        assert_off!(PowerState::Off.next(&history, &config));
    }

    #[test]
    fn test_far_window_turns_off() {
        let config = Config::DEFAULT;
        let history = DistanceHistory::<20>::from_config(&config);
        assert_off!(PowerState::On.next(&history, &config));
    }

    #[test]
    fn test_hysteresis() {
        let config = Config::DEFAULT;
        let mut history = DistanceHistory::<20>::from_config(&config);

        // 13 of 20 near is not enough to turn on
        fill(&mut history, 50, 13);
        assert_off!(PowerState::Off.next(&history, &config));

        // 14 of 20 is
        fill(&mut history, 50, 1);
        assert_on!(PowerState::Off.next(&history, &config));

        // Same window, but already on: 6 far votes do not turn it off
        assert_on!(PowerState::On.next(&history, &config));

        // Mixed window in the dead zone, neither state changes
        fill(&mut history, 100, 10);
        assert_off!(PowerState::Off.next(&history, &config));
        assert_on!(PowerState::On.next(&history, &config));

        // 14 of 20 far turns off
        fill(&mut history, 100, 4);
        assert_off!(PowerState::On.next(&history, &config));
    }

    #[test]
    fn test_single_transition_when_both_criteria_match() {
        // With a low accuracy both criteria match for an evenly split window
        let config = Config {
            required_accuracy: 0.5,
            ..Config::DEFAULT
        };
        let mut history = DistanceHistory::<4>::new(100);
        fill(&mut history, 50, 2);
        assert_on!(PowerState::Off.next(&history, &config));
        assert_off!(PowerState::On.next(&history, &config));
    }

    #[test]
    fn test_as_str() {
        assert_eq!(PowerState::On.as_str(), "ON");
        assert_eq!(PowerState::Off.as_str(), "OFF");
    }
}
