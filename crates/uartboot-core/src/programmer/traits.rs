//! Programmer trait definitions

use crate::error::Result;
use crate::spi::SpiCommand;

/// SPI Master trait
///
/// This trait represents the "exchange N bytes with chip-select asserted"
/// primitive. One call to [`execute`](SpiMaster::execute) is one complete
/// chip transaction: select, transmit header and write data, receive into
/// the read buffer, deselect. Implementations must release chip select on
/// every exit path, including errors.
///
/// ## Example
///
/// ```ignore
/// impl SpiMaster for MyProgrammer {
///     fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///         let mut header = [0u8; MAX_HEADER_LEN];
///         let len = cmd.encode_header(&mut header);
///         self.transfer(&header[..len], cmd.write_data, cmd.read_buf)
///     }
///
///     fn delay_us(&mut self, us: u32) {
///         self.timer.delay_us(us)
///     }
/// }
/// ```
pub trait SpiMaster {
    /// Execute a single SPI command
    ///
    /// The command contains all the information needed for the transaction:
    /// - `opcode`: The SPI command opcode
    /// - `address`: Optional address (with width)
    /// - `write_data`: Data to write after the header
    /// - `read_buf`: Buffer to read data into
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Half-duplex SPI peripheral without chip-select control
///
/// This is the shape of a typical MCU HAL: blocking transmit and receive
/// with a per-call timeout in milliseconds.
pub trait SpiBus {
    /// Transmit `data`, failing with `Timeout` or `TransferFailed`
    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<()>;

    /// Fill `buf` with received bytes
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<()>;

    /// Busy-wait for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

/// A single, exclusively owned chip-select line (active low on real parts)
pub trait ChipSelect {
    /// Assert chip select
    fn select(&mut self);

    /// Release chip select
    fn deselect(&mut self);
}

/// Monotonic millisecond time source used for deadlines
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall clock backed by `std::time::Instant`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
