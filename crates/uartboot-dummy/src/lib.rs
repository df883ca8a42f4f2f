//! uartboot-dummy - In-memory flash emulator for testing
//!
//! This crate provides a dummy SPI NOR chip that answers the raw opcode set
//! the flash driver speaks, plus a simulated clock and in-memory serial
//! links. It is used by the test suites and by the `serve` emulator.

mod clock;
mod link;

pub use clock::SimClock;
pub use link::{pipe, PipeEnd, ScriptedLink};

use std::collections::VecDeque;

use uartboot_core::error::{Error, Result};
use uartboot_core::flash::{Geometry, StatusRegister};
use uartboot_core::programmer::SpiMaster;
use uartboot_core::spi::{opcodes, SpiCommand};

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Name used in logs
    pub name: &'static str,
    /// REMS manufacturer ID
    pub manufacturer_id: u8,
    /// REMS device ID
    pub device_id: u8,
    /// RDID bytes: manufacturer, memory type, capacity code
    pub jedec_id: [u8; 3],
    /// Chip layout
    pub geometry: Geometry,
    /// Status reads reporting BUSY after each program/erase
    pub busy_polls: u32,
}

impl DummyConfig {
    /// Winbond W25Q64 (8 MiB)
    pub fn w25q64() -> Self {
        Self {
            name: "W25Q64",
            manufacturer_id: 0xEF,
            device_id: 0x16,
            jedec_id: [0xEF, 0x40, 0x17],
            geometry: Geometry::W25Q64,
            busy_polls: 0,
        }
    }

    /// Winbond W25Q128 (16 MiB)
    pub fn w25q128() -> Self {
        Self {
            name: "W25Q128",
            manufacturer_id: 0xEF,
            device_id: 0x17,
            jedec_id: [0xEF, 0x40, 0x18],
            geometry: Geometry::W25Q128,
            busy_polls: 0,
        }
    }

    /// Look up a preset by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w25q64" => Some(Self::w25q64()),
            "w25q128" => Some(Self::w25q128()),
            _ => None,
        }
    }

    /// Report BUSY for `polls` status reads after every program/erase
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self::w25q128()
    }
}

/// One command seen by the dummy chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    /// Opcode byte
    pub opcode: u8,
    /// Address phase, if any
    pub address: Option<u32>,
    /// Bytes clocked out by the host after the header
    pub write_len: usize,
    /// Bytes clocked in by the host
    pub read_len: usize,
}

/// Make every command with `opcode` fail once `after` of them succeeded
#[derive(Debug, Clone, Copy)]
struct Fault {
    opcode: u8,
    after: usize,
    seen: usize,
}

/// Dummy flash programmer
///
/// Emulates a W25Qxx chip in memory. Like the real part it ignores
/// program/erase commands without a preceding WREN, ignores everything but
/// status reads while busy, and ignores everything but RDP while in deep
/// power-down.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_remaining: u32,
    stuck_busy: bool,
    powered_down: bool,
    fault: Option<Fault>,
    history: VecDeque<Op>,
    delayed_us: u64,
}

/// Commands remembered for inspection
const HISTORY_DEPTH: usize = 4096;

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.geometry.total_size as usize];
        Self {
            config,
            data,
            write_enabled: false,
            busy_remaining: 0,
            stuck_busy: false,
            powered_down: false,
            fault: None,
            history: VecDeque::new(),
            delayed_us: 0,
        }
    }

    /// Create a new dummy flash with default configuration (W25Q128)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Keep the BUSY bit set forever (or release it)
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Fail every `opcode` command with `TransferFailed` after `after`
    /// of them have succeeded
    pub fn fail_opcode_after(&mut self, opcode: u8, after: usize) {
        self.fault = Some(Fault {
            opcode,
            after,
            seen: 0,
        });
    }

    /// Remove any injected fault
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Whether the chip is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Current write enable latch
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Commands executed so far, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Op> {
        self.history.iter()
    }

    /// Number of commands with `opcode` in the history
    pub fn count(&self, opcode: u8) -> usize {
        self.history.iter().filter(|op| op.opcode == opcode).count()
    }

    /// Forget the command history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Total microseconds requested through `delay_us`
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us
    }

    fn status(&self) -> StatusRegister {
        let mut sr = StatusRegister::empty();
        if self.stuck_busy || self.busy_remaining > 0 {
            sr |= StatusRegister::BUSY;
        }
        if self.write_enabled {
            sr |= StatusRegister::WEL;
        }
        sr
    }

    fn is_busy(&self) -> bool {
        self.stuck_busy || self.busy_remaining > 0
    }

    /// Program/erase completion: latch clears, chip goes busy
    fn finish_write_cycle(&mut self) {
        self.write_enabled = false;
        self.busy_remaining = self.config.busy_polls;
    }

    fn record(&mut self, cmd: &SpiCommand<'_>) {
        if self.history.len() == HISTORY_DEPTH {
            self.history.pop_front();
        }
        self.history.push_back(Op {
            opcode: cmd.opcode,
            address: cmd.address,
            write_len: cmd.write_data.len(),
            read_len: cmd.read_buf.len(),
        });
    }

    fn check_fault(&mut self, opcode: u8) -> Result<()> {
        if let Some(fault) = self.fault.as_mut() {
            if fault.opcode == opcode {
                if fault.seen >= fault.after {
                    log::debug!("dummy: injected failure for opcode 0x{:02X}", opcode);
                    return Err(Error::TransferFailed);
                }
                fault.seen += 1;
            }
        }
        Ok(())
    }

    fn handle_read(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let addr = cmd.address.unwrap_or(0) as usize;
        let len = cmd.read_buf.len();

        if addr + len > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }

        cmd.read_buf.copy_from_slice(&self.data[addr..addr + len]);
        Ok(())
    }

    fn handle_page_program(&mut self, cmd: &SpiCommand<'_>) -> Result<()> {
        if !self.write_enabled {
            log::debug!("dummy: PP without WREN ignored");
            return Ok(());
        }

        let page_size = self.config.geometry.page_size as usize;
        let addr = cmd.address.unwrap_or(0) as usize;
        let page_base = addr & !(page_size - 1);
        if page_base + page_size > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }

        // The page buffer wraps: bytes past the page end land at its start
        let mut latch = vec![0xFFu8; page_size];
        let start = addr - page_base;
        for (i, &byte) in cmd.write_data.iter().enumerate() {
            latch[(start + i) % page_size] = byte;
        }

        // Programming can only change 1 -> 0
        for (cell, &byte) in self.data[page_base..page_base + page_size]
            .iter_mut()
            .zip(latch.iter())
        {
            *cell &= byte;
        }

        self.finish_write_cycle();
        Ok(())
    }

    fn handle_erase(&mut self, cmd: &SpiCommand<'_>, erase_size: usize) -> Result<()> {
        if !self.write_enabled {
            log::debug!("dummy: erase without WREN ignored");
            return Ok(());
        }

        let addr = cmd.address.unwrap_or(0) as usize;

        if erase_size == 0 {
            return Err(Error::InvalidGeometry);
        }
        // Sector and block sizes need not be powers of two
        let aligned_addr = addr / erase_size * erase_size;

        if aligned_addr + erase_size > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }

        self.data[aligned_addr..aligned_addr + erase_size].fill(0xFF);
        self.finish_write_cycle();
        Ok(())
    }

    fn handle_chip_erase(&mut self) -> Result<()> {
        if !self.write_enabled {
            log::debug!("dummy: chip erase without WREN ignored");
            return Ok(());
        }

        self.data.fill(0xFF);
        self.finish_write_cycle();
        Ok(())
    }

    fn handle_rems(&mut self, cmd: &mut SpiCommand<'_>) {
        // Address bit 0 selects the output order
        let ids = if cmd.address.unwrap_or(0) & 1 == 0 {
            [self.config.manufacturer_id, self.config.device_id]
        } else {
            [self.config.device_id, self.config.manufacturer_id]
        };
        for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
            *byte = ids[i % 2];
        }
    }
}

impl SpiMaster for DummyFlash {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.record(cmd);
        self.check_fault(cmd.opcode)?;

        if self.powered_down {
            if cmd.opcode == opcodes::RDP {
                self.powered_down = false;
                cmd.read_buf.fill(self.config.device_id);
            } else {
                log::trace!("dummy: 0x{:02X} ignored in power-down", cmd.opcode);
                cmd.read_buf.fill(0xFF);
            }
            return Ok(());
        }

        if self.is_busy() && cmd.opcode != opcodes::RDSR {
            log::trace!("dummy: 0x{:02X} ignored while busy", cmd.opcode);
            cmd.read_buf.fill(0xFF);
            return Ok(());
        }

        match cmd.opcode {
            // Identification
            opcodes::RDID => {
                for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
                    *byte = self.config.jedec_id.get(i).copied().unwrap_or(0);
                }
                Ok(())
            }
            opcodes::REMS => {
                self.handle_rems(cmd);
                Ok(())
            }

            // Status register read
            opcodes::RDSR => {
                let status = self.status().bits();
                cmd.read_buf.fill(status);
                if self.busy_remaining > 0 {
                    self.busy_remaining -= 1;
                }
                Ok(())
            }

            // Write enable/disable
            opcodes::WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::WRDI => {
                self.write_enabled = false;
                Ok(())
            }

            opcodes::READ => self.handle_read(cmd),
            opcodes::PP => self.handle_page_program(cmd),

            // Erase commands
            opcodes::SE_20 => {
                let size = self.config.geometry.sector_size as usize;
                self.handle_erase(cmd, size)
            }
            opcodes::BE_D8 => {
                let size = self.config.geometry.block_size as usize;
                self.handle_erase(cmd, size)
            }
            opcodes::CE_C7 => self.handle_chip_erase(),

            // Power management
            opcodes::DP => {
                self.powered_down = true;
                Ok(())
            }
            opcodes::RDP => {
                cmd.read_buf.fill(self.config.device_id);
                Ok(())
            }

            // Unknown opcode
            _ => Err(Error::TransferFailed),
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += us as u64;
    }
}
