//! The hardware the control loop talks to.

use crate::{
    errors::Error,
    states::{PowerState, Transition},
    Centimeters,
};

/// Something that can measure a distance.
pub trait DistanceSource {
    /// Trigger a measurement and return the distance. A value of 0 or an
    /// error mean that there was no usable reading.
    fn read(&mut self) -> Result<Centimeters, Error>;
}

/// The output that switches the controlled device.
pub trait PowerOutput {
    /// Drive the output. Called every cycle, repeated calls with the same
    /// value must be harmless.
    fn set(&mut self, on: bool) -> Result<(), Error>;
}

/// Sink for advisory status output.
pub trait Diagnostics {
    fn report(&mut self, state: PowerState, distance: Centimeters) -> Result<(), Error>;

    fn transition(&mut self, _transition: Transition) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: DistanceSource + ?Sized> DistanceSource for &mut T {
    fn read(&mut self) -> Result<Centimeters, Error> {
        (**self).read()
    }
}

impl<T: PowerOutput + ?Sized> PowerOutput for &mut T {
    fn set(&mut self, on: bool) -> Result<(), Error> {
        (**self).set(on)
    }
}

impl<T: Diagnostics + ?Sized> Diagnostics for &mut T {
    fn report(&mut self, state: PowerState, distance: Centimeters) -> Result<(), Error> {
        (**self).report(state, distance)
    }

    fn transition(&mut self, transition: Transition) -> Result<(), Error> {
        (**self).transition(transition)
    }
}
