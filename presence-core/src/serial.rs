//! Status reports over a serial line.
//!
//! Every cycle produces one line in the form
//!
//! ```text
//! State: ON; Distance[cm]: 42
//! ```
//!
//! and every power state change an additional line
//!
//! ```text
//! :: State transition: OFF -> ON
//! ```

use ufmt::{uWrite, uwrite};

use crate::{
    errors::Error,
    interfaces::Diagnostics,
    states::{PowerState, Transition},
    Centimeters,
};

/// Writes status reports to any `ufmt` writer.
pub struct SerialReporter<W> {
    writer: W,
}

impl<W: uWrite> SerialReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn release(self) -> W {
        self.writer
    }
}

impl<W: uWrite> Diagnostics for SerialReporter<W> {
    fn report(&mut self, state: PowerState, distance: Centimeters) -> Result<(), Error> {
        uwrite!(self.writer, "State: {}; Distance[cm]: {}\r\n", state, distance)
            .map_err(|_| Error::SerialWriteError)
    }

    fn transition(&mut self, transition: Transition) -> Result<(), Error> {
        uwrite!(
            self.writer,
            ":: State transition: {} -> {}\r\n",
            transition.from,
            transition.to
        )
        .map_err(|_| Error::SerialWriteError)
    }
}
