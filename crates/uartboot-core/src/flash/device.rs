//! Flash device trait
//!
//! This is the capability the bootloader engine consumes. It never names a
//! chip model; the geometry carries everything the engine needs to know.

use super::Geometry;
use crate::error::Result;

/// Byte-addressed flash device
///
/// # Example
///
/// ```ignore
/// use uartboot_core::flash::FlashDevice;
///
/// fn first_sector<D: FlashDevice>(device: &mut D, buf: &mut [u8; 4096]) -> Result<()> {
///     device.read(0, buf)
/// }
/// ```
pub trait FlashDevice {
    /// Get the chip geometry
    fn geometry(&self) -> &Geometry;

    /// Manufacturer and device ID (REMS)
    fn identify(&mut self) -> Result<(u8, u8)>;

    /// Manufacturer, memory type and capacity code (RDID)
    fn identify_jedec(&mut self) -> Result<[u8; 3]>;

    /// Read flash contents into the provided buffer
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If the read extends beyond flash size
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program data to flash
    ///
    /// The target region should be erased first (all bytes 0xFF).
    /// Page alignment is handled internally.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If the write extends beyond flash size
    /// * `Timeout` - If a page program did not finish in time
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase the sector containing `addr`
    fn erase_sector(&mut self, addr: u32) -> Result<()>;

    /// Erase the entire chip
    fn erase_chip(&mut self) -> Result<()>;

    /// Get the total flash size in bytes
    fn size(&self) -> u32 {
        self.geometry().total_size
    }

    /// Check if a range is valid for this device
    fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        self.geometry().is_valid_range(addr, len)
    }
}

impl<D: FlashDevice + ?Sized> FlashDevice for &mut D {
    fn geometry(&self) -> &Geometry {
        (**self).geometry()
    }

    fn identify(&mut self) -> Result<(u8, u8)> {
        (**self).identify()
    }

    fn identify_jedec(&mut self) -> Result<[u8; 3]> {
        (**self).identify_jedec()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<()> {
        (**self).erase_sector(addr)
    }

    fn erase_chip(&mut self) -> Result<()> {
        (**self).erase_chip()
    }
}
