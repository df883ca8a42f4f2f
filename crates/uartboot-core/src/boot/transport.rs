//! Serial transport seen by the bootloader engine

use core::time::Duration;

use crate::error::Result;

/// Byte stream with deadlines
///
/// On a microcontroller this wraps the UART HAL. On a host it can be a
/// serial port, a TCP socket or an in-memory pipe.
///
/// Errors: `Timeout` when the deadline passes before the request is
/// satisfied, `Disconnected` when the peer has gone away for good, and
/// `TransportError` for anything else.
pub trait Transport {
    /// Fill `buf` completely, waiting at most `timeout` (`None` waits forever)
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<()>;

    /// Send all of `data` within `timeout`
    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<()>;

    /// Push out anything buffered
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<()> {
        (**self).read(buf, timeout)
    }

    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<()> {
        (**self).write(data, timeout)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
