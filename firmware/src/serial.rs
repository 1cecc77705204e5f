//! Helpers for using the serial port.

use presence_core::errors::Error;
use rtic::Mutex;
use stm32f4xx_hal::otg_fs::UsbBusType;
use usbd_serial::SerialPort;

// Configure serial buffer
pub const SERIAL_READ_BUFFER_BYTES: usize = 64;
pub const SERIAL_WRITE_BUFFER_BYTES: usize = 512;

/// Type alias for the serial port type
pub type SerialPortType = SerialPort<
    'static,
    UsbBusType,
    [u8; SERIAL_READ_BUFFER_BYTES],
    [u8; SERIAL_WRITE_BUFFER_BYTES],
>;

/// Wrapper for a shared `SerialPort` resource that supports ufmt.
///
/// The port is also used by the USB interrupt, so every write locks it.
pub struct SerialWriter<M>(pub M);

impl<M> ufmt::uWrite for SerialWriter<M>
where
    M: Mutex<T = SerialPortType>,
{
    type Error = Error;
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.0
            .lock(|serial| serial.write(s.as_bytes()))
            .map(|_| ())
            .map_err(|_| Error::SerialWriteError)
    }
}
