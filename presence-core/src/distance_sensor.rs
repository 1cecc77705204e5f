//! HC-SR04 ultrasonic distance sensor.
//!
//! A 10 µs pulse on the trigger pin starts a measurement. The sensor then
//! raises the echo pin for as long as the sound took to travel to the
//! obstacle and back, 58 µs per centimeter of distance.

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};

use crate::{errors::Error, interfaces::DistanceSource, Centimeters};

/// Echo waits longer than this are aborted. The sensor gives up after ~38 ms
/// when there is no obstacle in range.
pub const DEFAULT_TIMEOUT_US: u32 = 30_000;

const ECHO_US_PER_CM: u32 = 58;

/// Free-running tick counter used to time the echo pulse.
pub trait PulseClock {
    /// Current counter value. Wraps around at `u32::MAX`.
    fn ticks(&mut self) -> u32;

    fn ticks_per_us(&self) -> u32;
}

pub struct Hcsr04<Trig, Echo, Delay, Clock> {
    trig: Trig,
    echo: Echo,
    delay: Delay,
    clock: Clock,
    timeout_us: u32,
}

impl<Trig, Echo, Delay, Clock> Hcsr04<Trig, Echo, Delay, Clock>
where
    Trig: OutputPin,
    Echo: InputPin,
    Delay: DelayUs<u32>,
    Clock: PulseClock,
{
    pub fn new(trig: Trig, echo: Echo, delay: Delay, clock: Clock) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock,
            timeout_us: DEFAULT_TIMEOUT_US,
        }
    }

    pub fn with_timeout(self, timeout_us: u32) -> Self {
        Self { timeout_us, ..self }
    }

    /// Trigger a measurement and return the echo pulse length in µs.
    pub fn measure_pulse_us(&mut self) -> Result<u32, Error> {
        // The echo of an earlier measurement may still be running
        let idle = self.clock.ticks();
        nb::block!(self.poll_echo(false, idle))?;

        self.trigger()?;

        let sent = self.clock.ticks();
        nb::block!(self.poll_echo(true, sent))?;

        let rise = self.clock.ticks();
        nb::block!(self.poll_echo(false, rise))?;

        Ok(self.elapsed_us(rise))
    }

    pub fn release(self) -> (Trig, Echo, Delay, Clock) {
        (self.trig, self.echo, self.delay, self.clock)
    }

    fn trigger(&mut self) -> Result<(), Error> {
        self.trig.set_low().map_err(|_| Error::SensorGpioError)?;
        self.delay.delay_us(2);
        self.trig.set_high().map_err(|_| Error::SensorGpioError)?;
        self.delay.delay_us(10);
        self.trig.set_low().map_err(|_| Error::SensorGpioError)
    }

    /// Check whether the echo pin is at the `high` level yet.
    fn poll_echo(&mut self, high: bool, since: u32) -> nb::Result<(), Error> {
        let is_high = self
            .echo
            .is_high()
            .map_err(|_| nb::Error::Other(Error::SensorGpioError))?;
        if is_high == high {
            Ok(())
        } else if self.elapsed_us(since) >= self.timeout_us {
            Err(nb::Error::Other(Error::SensorTimeout))
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn elapsed_us(&mut self, since: u32) -> u32 {
        let ticks_per_us = self.clock.ticks_per_us().max(1);
        self.clock.ticks().wrapping_sub(since) / ticks_per_us
    }
}

impl<Trig, Echo, Delay, Clock> DistanceSource for Hcsr04<Trig, Echo, Delay, Clock>
where
    Trig: OutputPin,
    Echo: InputPin,
    Delay: DelayUs<u32>,
    Clock: PulseClock,
{
    fn read(&mut self) -> Result<Centimeters, Error> {
        Ok(self.measure_pulse_us()? / ECHO_US_PER_CM)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use super::*;

    /// Simulated time in ticks, shared between clock and echo pin.
    type Now = Rc<Cell<u32>>;

    struct MockClock {
        now: Now,
        step: u32,
        ticks_per_us: u32,
    }

    impl PulseClock for MockClock {
        fn ticks(&mut self) -> u32 {
            let ticks = self.now.get();
            self.now.set(ticks.wrapping_add(self.step));
            ticks
        }

        fn ticks_per_us(&self) -> u32 {
            self.ticks_per_us
        }
    }

    /// Echo pin that is high between `rise` and `fall` ticks after `start`,
    /// and before `stale_until` ticks from an earlier measurement.
    struct MockEcho {
        now: Now,
        start: u32,
        stale_until: u32,
        rise: Option<u32>,
        fall: Option<u32>,
    }

    impl InputPin for MockEcho {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Self::Error> {
            let t = self.now.get().wrapping_sub(self.start);
            if t < self.stale_until {
                return Ok(true);
            }
            Ok(match (self.rise, self.fall) {
                (Some(rise), Some(fall)) => t >= rise && t < fall,
                (Some(rise), None) => t >= rise,
                (None, _) => false,
            })
        }

        fn is_low(&self) -> Result<bool, Self::Error> {
            self.is_high().map(|high| !high)
        }
    }

    /// Records every level the trigger pin is set to.
    #[derive(Clone, Default)]
    struct MockTrig {
        levels: Rc<RefCell<Vec<bool>>>,
    }

    impl OutputPin for MockTrig {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.borrow_mut().push(true);
            Ok(())
        }
    }

    struct BrokenPin;

    impl OutputPin for BrokenPin {
        type Error = ();

        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(())
        }
    }

    #[derive(Clone, Default)]
    struct MockDelay {
        delays: Rc<RefCell<Vec<u32>>>,
    }

    impl DelayUs<u32> for MockDelay {
        fn delay_us(&mut self, us: u32) {
            self.delays.borrow_mut().push(us);
        }
    }

    fn sensor(
        start: u32,
        rise: Option<u32>,
        fall: Option<u32>,
        ticks_per_us: u32,
    ) -> (MockEcho, MockClock) {
        let now = Rc::new(Cell::new(start));
        let echo = MockEcho {
            now: now.clone(),
            start,
            stale_until: 0,
            rise,
            fall,
        };
        let clock = MockClock {
            now,
            step: ticks_per_us,
            ticks_per_us,
        };
        (echo, clock)
    }

    #[test]
    fn test_trigger_pulse() {
        let trig = MockTrig::default();
        let delay = MockDelay::default();
        let (echo, clock) = sensor(0, Some(100), Some(100 + 58 * 42), 1);

        let mut hcsr04 = Hcsr04::new(trig.clone(), echo, delay.clone(), clock);
        hcsr04.read().unwrap();

        assert_eq!(*trig.levels.borrow(), vec![false, true, false]);
        assert_eq!(*delay.delays.borrow(), vec![2, 10]);
    }

    #[test]
    fn test_distance() {
        let (echo, clock) = sensor(0, Some(100), Some(100 + 58 * 42), 1);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Ok(42));
    }

    #[test]
    fn test_distance_with_fast_clock() {
        // 48 ticks per µs, like the cycle counter at 48 MHz
        let (echo, clock) = sensor(0, Some(48 * 300), Some(48 * (300 + 58 * 65)), 48);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Ok(65));
    }

    #[test]
    fn test_counter_wraparound() {
        let (echo, clock) = sensor(u32::MAX - 1000, Some(500), Some(500 + 58 * 100), 1);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Ok(100));
    }

    #[test]
    fn test_no_echo_times_out() {
        let (echo, clock) = sensor(0, None, None, 1);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock).with_timeout(1000);
        assert_eq!(hcsr04.read(), Err(Error::SensorTimeout));
    }

    #[test]
    fn test_stuck_echo_times_out() {
        let (echo, clock) = sensor(0, Some(10), None, 1);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.measure_pulse_us(), Err(Error::SensorTimeout));
    }

    #[test]
    fn test_waits_for_previous_echo_to_end() {
        let (mut echo, clock) = sensor(0, Some(1000), Some(1000 + 58 * 42), 1);
        echo.stale_until = 500;
        let now = echo.now.clone();

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Ok(42));
        assert!(now.get() > 1000 + 58 * 42);
    }

    #[test]
    fn test_leftover_echo_is_not_a_reading() {
        // Echo already high when the measurement starts, no fresh echo after it
        let (echo, clock) = sensor(0, Some(0), Some(58 * 42), 1);

        let mut hcsr04 = Hcsr04::new(MockTrig::default(), echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Err(Error::SensorTimeout));
    }

    #[test]
    fn test_echo_stuck_high_before_trigger() {
        let trig = MockTrig::default();
        let (echo, clock) = sensor(0, Some(0), None, 1);

        let mut hcsr04 =
            Hcsr04::new(trig.clone(), echo, MockDelay::default(), clock).with_timeout(1000);
        assert_eq!(hcsr04.read(), Err(Error::SensorTimeout));
        // Never triggered
        assert!(trig.levels.borrow().is_empty());
    }

    #[test]
    fn test_trigger_error() {
        let (echo, clock) = sensor(0, Some(100), Some(200), 1);

        let mut hcsr04 = Hcsr04::new(BrokenPin, echo, MockDelay::default(), clock);
        assert_eq!(hcsr04.read(), Err(Error::SensorGpioError));
    }
}
