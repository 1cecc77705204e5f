//! Relay that switches the controlled device.

use embedded_hal::digital::v2::OutputPin;

use crate::{errors::Error, interfaces::PowerOutput};

/// Pin level that switches the device on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

pub struct Relay<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Most cheap relay modules pull in the relay when the input is low.
    pub fn active_low(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveLow)
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PowerOutput for Relay<P> {
    fn set(&mut self, on: bool) -> Result<(), Error> {
        let high = match self.polarity {
            Polarity::ActiveHigh => on,
            Polarity::ActiveLow => !on,
        };
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|_| Error::RelayGpioWriteError)
    }
}
