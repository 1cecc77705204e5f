//! Error handling.

use heapless::spsc::Queue;

/// All possible error types
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    SensorTimeout,
    SensorGpioError,
    RelayGpioWriteError,
    SerialWriteError,
    InvalidThreshold,
    InvalidAccuracy,
    InvalidWindow,
}

impl Error {
    /// Record this error in the queue. If the queue is full, the oldest entry
    /// is dropped.
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                // Queue full, drop the oldest value and try again
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SensorTimeout => "HC-SR04: Echo timeout",
            Self::SensorGpioError => "HC-SR04: GPIO access failed",
            Self::RelayGpioWriteError => "Relay GPIO write error",
            Self::SerialWriteError => "Write serial log using ufmt failed",
            Self::InvalidThreshold => "Config: Power-on threshold must lie between 0 and the max valid distance",
            Self::InvalidAccuracy => "Config: Required accuracy must lie in (0, 1]",
            Self::InvalidWindow => "Config: Window size and period must be non-zero",
        }
    }

    pub fn to_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl ufmt::uDisplay for Error {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_enqueues() {
        let mut queue: Queue<Error, 4> = Queue::new();
        Error::SensorTimeout.log(&mut queue);
        Error::SerialWriteError.log(&mut queue);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue(), Some(Error::SensorTimeout));
        assert_eq!(queue.dequeue(), Some(Error::SerialWriteError));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_log_drops_oldest_when_full() {
        // A heapless queue of size N holds N - 1 elements
        let mut queue: Queue<Error, 4> = Queue::new();
        Error::SensorTimeout.log(&mut queue);
        Error::SensorGpioError.log(&mut queue);
        Error::RelayGpioWriteError.log(&mut queue);
        Error::SerialWriteError.log(&mut queue);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some(Error::SensorGpioError));
        assert_eq!(queue.dequeue(), Some(Error::RelayGpioWriteError));
        assert_eq!(queue.dequeue(), Some(Error::SerialWriteError));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(Error::SensorTimeout.to_bytes(), b"HC-SR04: Echo timeout");
    }
}
