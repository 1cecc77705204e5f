//! Timing based on the DWT cycle counter.
//!
//! The cycle counter must be enabled before use, see `DWT::enable_cycle_counter`.

use cortex_m::peripheral::DWT;
use embedded_hal::blocking::delay::DelayUs;
use presence_core::distance_sensor::PulseClock;

#[derive(Clone, Copy)]
pub struct CycleCounter {
    cycles_per_us: u32,
}

impl CycleCounter {
    pub fn new(sysclk_hz: u32) -> Self {
        Self {
            cycles_per_us: sysclk_hz / 1_000_000,
        }
    }
}

impl PulseClock for CycleCounter {
    fn ticks(&mut self) -> u32 {
        DWT::cycle_count()
    }

    fn ticks_per_us(&self) -> u32 {
        self.cycles_per_us
    }
}

/// Busy waiting, for the few microseconds of the sensor trigger pulse.
impl DelayUs<u32> for CycleCounter {
    fn delay_us(&mut self, us: u32) {
        let start = DWT::cycle_count();
        let cycles = us.saturating_mul(self.cycles_per_us);
        while DWT::cycle_count().wrapping_sub(start) < cycles {}
    }
}
