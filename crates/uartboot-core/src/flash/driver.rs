//! Geometry-parameterized SPI NOR flash driver

use super::{FlashDevice, Geometry, StatusRegister};
use crate::error::{Error, Result};
use crate::programmer::{Clock, SpiMaster};
use crate::protocol;
use crate::spi::opcodes;

/// Busy-poll deadlines per operation kind, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeouts {
    /// Page program
    pub page_program_ms: u32,
    /// 4 KiB sector erase
    pub sector_erase_ms: u32,
    /// 64 KiB block erase
    pub block_erase_ms: u32,
    /// Whole-chip erase
    pub chip_erase_ms: u32,
}

impl PollTimeouts {
    /// One fixed ceiling for every operation
    pub const fn uniform(timeout_ms: u32) -> Self {
        Self {
            page_program_ms: timeout_ms,
            sector_erase_ms: timeout_ms,
            block_erase_ms: timeout_ms,
            chip_erase_ms: timeout_ms,
        }
    }

    /// Deadlines derived from W25Qxx worst-case timings
    ///
    /// Page program 10 ms, sector erase 1 s, block erase 4 s, chip erase 200 s.
    pub const fn datasheet() -> Self {
        Self {
            page_program_ms: 10,
            sector_erase_ms: 1_000,
            block_erase_ms: 4_000,
            chip_erase_ms: 200_000,
        }
    }
}

impl Default for PollTimeouts {
    /// 5 s for everything. A real chip erase can outlast this, in which case
    /// the driver reports `Timeout` while the chip keeps erasing.
    fn default() -> Self {
        Self::uniform(5_000)
    }
}

/// SPI NOR flash driver
///
/// Owns the raw transport (and with it the chip-select line), the clock
/// used for busy-poll deadlines, the geometry and the poll timeouts.
/// Supported parts differ only in their [`Geometry`].
pub struct FlashDriver<M, C> {
    master: M,
    clock: C,
    geometry: Geometry,
    timeouts: PollTimeouts,
}

impl<M: SpiMaster, C: Clock> FlashDriver<M, C> {
    /// Create a driver with the default poll timeouts
    pub fn new(master: M, clock: C, geometry: Geometry) -> Self {
        Self {
            master,
            clock,
            geometry,
            timeouts: PollTimeouts::default(),
        }
    }

    /// Replace the poll timeouts
    pub fn with_timeouts(mut self, timeouts: PollTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Get the chip geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Get the poll timeouts in use
    pub fn timeouts(&self) -> &PollTimeouts {
        &self.timeouts
    }

    /// Get a reference to the raw transport
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Get a mutable reference to the raw transport
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// Give back the raw transport and the clock
    pub fn release(self) -> (M, C) {
        (self.master, self.clock)
    }

    /// Bring the chip out of deep power-down
    ///
    /// Must be called once after power-up before any other operation.
    pub fn init(&mut self) -> Result<()> {
        log::debug!(
            "flash: init, {} KiB, page {} B, sector {} B",
            self.geometry.total_size / 1024,
            self.geometry.page_size,
            self.geometry.sector_size
        );
        self.wake_up()
    }

    /// Manufacturer and device ID via REMS (0x90)
    pub fn identify(&mut self) -> Result<(u8, u8)> {
        let ids = protocol::read_rems(&mut self.master)?;
        log::debug!("flash: REMS {:02X} {:02X}", ids.0, ids.1);
        Ok(ids)
    }

    /// JEDEC ID via RDID (0x9F)
    pub fn identify_jedec(&mut self) -> Result<[u8; 3]> {
        let id = protocol::read_jedec_id(&mut self.master)?;
        log::debug!("flash: JEDEC {:02X} {:02X} {:02X}", id[0], id[1], id[2]);
        Ok(id)
    }

    /// Read status register 1
    pub fn read_status(&mut self) -> Result<StatusRegister> {
        protocol::read_status(&mut self.master)
    }

    /// Set the write enable latch
    pub fn write_enable(&mut self) -> Result<()> {
        protocol::write_enable(&mut self.master)
    }

    /// Clear the write enable latch
    pub fn write_disable(&mut self) -> Result<()> {
        protocol::write_disable(&mut self.master)
    }

    /// Poll until the chip is idle or `timeout_ms` has elapsed
    pub fn wait_ready(&mut self, timeout_ms: u32) -> Result<()> {
        protocol::wait_ready(
            &mut self.master,
            &self.clock,
            protocol::POLL_INTERVAL_US,
            timeout_ms,
        )
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// No alignment requirement. Out-of-range requests fail before any
    /// chip access.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if !self.geometry.is_valid_range(addr, buf.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        log::trace!("flash: read {} bytes at 0x{:06X}", buf.len(), addr);
        protocol::read_3b(&mut self.master, addr, buf)
    }

    /// Program at most one page
    ///
    /// Fails with `InvalidLength` before touching the chip if `data` is
    /// longer than a page. The caller must not let `data` cross a page
    /// boundary; use [`write`](Self::write) for arbitrary ranges.
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() > self.geometry.page_size as usize {
            return Err(Error::InvalidLength);
        }
        if !self.geometry.is_valid_range(addr, data.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        protocol::program_page_3b(
            &mut self.master,
            &self.clock,
            addr,
            data,
            self.timeouts.page_program_ms,
        )
    }

    /// Program an arbitrary range, split at page boundaries
    ///
    /// Stops at the first failing page; pages already programmed stay
    /// programmed.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if !self.geometry.is_valid_range(addr, data.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        log::debug!("flash: write {} bytes at 0x{:06X}", data.len(), addr);
        for chunk in self.geometry.page_chunks(addr, data.len()) {
            let slice = &data[chunk.offset..chunk.offset + chunk.len];
            self.write_page(chunk.address, slice).inspect_err(|e| {
                log::warn!("flash: page program at 0x{:06X} failed: {}", chunk.address, e)
            })?;
        }
        Ok(())
    }

    /// Erase the 4 KiB sector containing `addr`
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        self.erase_with(opcodes::SE_20, addr, self.timeouts.sector_erase_ms)
    }

    /// Erase the 64 KiB block containing `addr`
    pub fn erase_block_64k(&mut self, addr: u32) -> Result<()> {
        self.erase_with(opcodes::BE_D8, addr, self.timeouts.block_erase_ms)
    }

    /// Erase the entire chip
    ///
    /// Blocks for up to the chip-erase poll timeout.
    pub fn erase_chip(&mut self) -> Result<()> {
        log::debug!("flash: chip erase");
        protocol::chip_erase(&mut self.master, &self.clock, self.timeouts.chip_erase_ms)
    }

    /// Enter deep power-down (0xB9)
    pub fn power_down(&mut self) -> Result<()> {
        log::debug!("flash: power down");
        protocol::power_down(&mut self.master)
    }

    /// Release from deep power-down (0xAB), then wait 1 ms
    pub fn wake_up(&mut self) -> Result<()> {
        protocol::release_power_down(&mut self.master)
    }

    fn erase_with(&mut self, opcode: u8, addr: u32, timeout_ms: u32) -> Result<()> {
        if !self.geometry.contains(addr) {
            return Err(Error::AddressOutOfBounds);
        }
        log::debug!("flash: erase 0x{:02X} at 0x{:06X}", opcode, addr);
        protocol::erase_block(&mut self.master, &self.clock, opcode, addr, timeout_ms)
    }
}

impl<M: SpiMaster, C: Clock> FlashDevice for FlashDriver<M, C> {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn identify(&mut self) -> Result<(u8, u8)> {
        FlashDriver::identify(self)
    }

    fn identify_jedec(&mut self) -> Result<[u8; 3]> {
        FlashDriver::identify_jedec(self)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        FlashDriver::read(self, addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        FlashDriver::write(self, addr, data)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<()> {
        FlashDriver::erase_sector(self, addr)
    }

    fn erase_chip(&mut self) -> Result<()> {
        FlashDriver::erase_chip(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::SpiCommand;

    /// Counts commands and never reports busy
    #[derive(Default)]
    struct Counter {
        commands: usize,
    }

    impl SpiMaster for Counter {
        fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
            self.commands += 1;
            cmd.read_buf.fill(0);
            Ok(())
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    struct Frozen;

    impl Clock for Frozen {
        fn now_ms(&self) -> u64 {
            0
        }
    }

    fn driver() -> FlashDriver<Counter, Frozen> {
        FlashDriver::new(Counter::default(), Frozen, Geometry::W25Q64)
    }

    #[test]
    fn test_poll_timeout_presets() {
        assert_eq!(PollTimeouts::default(), PollTimeouts::uniform(5000));
        assert_eq!(PollTimeouts::datasheet().chip_erase_ms, 200_000);
    }

    #[test]
    fn test_oversized_page_rejected_without_io() {
        let mut flash = driver();
        let data = [0u8; 257];
        assert_eq!(flash.write_page(0, &data), Err(Error::InvalidLength));
        assert_eq!(flash.master().commands, 0);
    }

    #[test]
    fn test_out_of_range_rejected_without_io() {
        let mut flash = driver();
        let end = Geometry::W25Q64.total_size;
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(end - 2, &mut buf), Err(Error::AddressOutOfBounds));
        assert_eq!(flash.write(end - 2, &buf), Err(Error::AddressOutOfBounds));
        assert_eq!(flash.erase_sector(end), Err(Error::AddressOutOfBounds));
        assert_eq!(flash.erase_block_64k(end), Err(Error::AddressOutOfBounds));
        assert_eq!(flash.master().commands, 0);
    }

    #[test]
    fn test_write_issues_one_program_sequence_per_chunk() {
        let mut flash = driver();
        let data = [0u8; 10];
        flash.write(253, &data).unwrap();
        // Two chunks, each WREN + PP + one RDSR
        assert_eq!(flash.master().commands, 6);
    }
}
