//! The control loop.
//!
//! Each cycle takes one distance sample, feeds valid samples into the
//! history, re-evaluates the power state and drives the output. The loop is
//! strictly sequential and never fails: errors from the sensor, the output or
//! the diagnostics end up in a bounded error log and the next cycle runs as
//! usual.

use embedded_hal::blocking::delay::DelayMs;
use heapless::spsc::Queue;

use crate::{
    config::Config,
    errors::Error,
    history::DistanceHistory,
    interfaces::{Diagnostics, DistanceSource, PowerOutput},
    states::{PowerState, Transition},
    Centimeters,
};

/// Size of the error log queue. Holds one entry less than this.
pub const ERROR_LOG_SIZE: usize = 8;

/// Outcome of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    /// Power state after this cycle
    pub state: PowerState,
    /// The raw reading, 0 if the sensor failed
    pub distance: Centimeters,
    /// Whether the reading made it into the history
    pub accepted: bool,
    pub transition: Option<Transition>,
}

pub struct ControlLoop<S, P, D, const N: usize> {
    source: S,
    output: P,
    diagnostics: D,
    config: Config,
    history: DistanceHistory<N>,
    state: PowerState,
    errors: Queue<Error, ERROR_LOG_SIZE>,
}

impl<S, P, D, const N: usize> ControlLoop<S, P, D, N>
where
    S: DistanceSource,
    P: PowerOutput,
    D: Diagnostics,
{
    /// Validate the config, set up the history and switch the output off.
    pub fn new(config: Config, source: S, output: P, diagnostics: D) -> Result<Self, Error> {
        config.validate(N)?;
        let mut control = Self {
            source,
            output,
            diagnostics,
            config,
            history: DistanceHistory::from_config(&config),
            state: PowerState::Off,
            errors: Queue::new(),
        };
        control.apply_state();
        Ok(control)
    }

    /// Run a single cycle.
    pub fn tick(&mut self) -> Cycle {
        let distance = match self.source.read() {
            Ok(distance) => distance,
            Err(e) => {
                e.log(&mut self.errors);
                0
            }
        };

        let accepted = self.config.is_valid_sample(distance);
        let mut transition = None;
        if accepted {
            self.history.push(distance);
            let next = self.state.next(&self.history, &self.config);
            if next != self.state {
                transition = Some(Transition {
                    from: self.state,
                    to: next,
                });
                self.state = next;
            }
        }

        // Re-assert the output even if nothing changed
        self.apply_state();

        if let Some(transition) = transition {
            if let Err(e) = self.diagnostics.transition(transition) {
                e.log(&mut self.errors);
            }
        }
        if let Err(e) = self.diagnostics.report(self.state, distance) {
            e.log(&mut self.errors);
        }

        Cycle {
            state: self.state,
            distance,
            accepted,
            transition,
        }
    }

    /// Run a cycle, hand all logged errors to `on_error` and wait for one
    /// sample period.
    pub fn cycle<T, F>(&mut self, delay: &mut T, mut on_error: F) -> Cycle
    where
        T: DelayMs<u32>,
        F: FnMut(Error),
    {
        let cycle = self.tick();
        while let Some(e) = self.errors.dequeue() {
            on_error(e);
        }
        delay.delay_ms(self.sample_period_ms());
        cycle
    }

    /// Run the control loop forever.
    pub fn run<T, F>(&mut self, delay: &mut T, mut on_error: F) -> !
    where
        T: DelayMs<u32>,
        F: FnMut(Error),
    {
        loop {
            self.cycle(delay, &mut on_error);
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn history(&self) -> &DistanceHistory<N> {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sample_period_ms(&self) -> u32 {
        self.config.sample_period_ms(N)
    }

    /// Take the oldest entry from the error log.
    pub fn pop_error(&mut self) -> Option<Error> {
        self.errors.dequeue()
    }

    fn apply_state(&mut self) {
        if let Err(e) = self.output.set(self.state.is_on()) {
            e.log(&mut self.errors);
        }
    }
}
