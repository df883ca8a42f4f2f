//! SPI25 protocol implementation
//!
//! This module implements the common SPI flash command sequences
//! as defined by JEDEC, restricted to single I/O and 3-byte addressing.
//!
//! Every function here is a thin sequence of [`SpiCommand`]s; range checks
//! and page splitting are the caller's job (see [`crate::flash::FlashDriver`]).

use crate::error::{Error, Result};
use crate::flash::StatusRegister;
use crate::programmer::{Clock, SpiMaster};
use crate::spi::{opcodes, SpiCommand};

/// Delay between two status polls
pub const POLL_INTERVAL_US: u32 = 100;

/// Time the chip needs to leave deep power-down
pub const WAKE_UP_DELAY_US: u32 = 1000;

/// Read manufacturer and device ID via REMS (0x90)
///
/// The command takes a 3-byte dummy address of zero.
pub fn read_rems<M: SpiMaster + ?Sized>(master: &mut M) -> Result<(u8, u8)> {
    let mut buf = [0u8; 2];
    let mut cmd = SpiCommand::read_3b(opcodes::REMS, 0, &mut buf);
    master.execute(&mut cmd)?;
    Ok((buf[0], buf[1]))
}

/// Read the JEDEC ID from a flash chip
///
/// Returns manufacturer, memory type and capacity code.
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<[u8; 3]> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf)
}

/// Read the status register 1
pub fn read_status<M: SpiMaster + ?Sized>(master: &mut M) -> Result<StatusRegister> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    master.execute(&mut cmd)?;
    Ok(StatusRegister::from_bits_retain(buf[0]))
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Send the Write Disable command
pub fn write_disable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WRDI);
    master.execute(&mut cmd)
}

/// Wait for the chip to clear its busy bit
///
/// The deadline is computed once, before the first poll. A failed status
/// read is reported as `TransferFailed`, an expired deadline as `Timeout`.
pub fn wait_ready<M, C>(master: &mut M, clock: &C, poll_delay_us: u32, timeout_ms: u32) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    let deadline = clock.now_ms().saturating_add(timeout_ms as u64);
    let mut polls: u32 = 0;

    loop {
        let status = read_status(master).map_err(|_| Error::TransferFailed)?;
        polls = polls.saturating_add(1);
        if !status.is_busy() {
            log::trace!("spi25: ready after {} polls", polls);
            return Ok(());
        }
        if clock.now_ms() > deadline {
            log::debug!("spi25: still busy after {} ms ({} polls)", timeout_ms, polls);
            return Err(Error::Timeout);
        }
        if poll_delay_us > 0 {
            master.delay_us(poll_delay_us);
        }
    }
}

/// Read data from flash using 3-byte addressing, as one burst
pub fn read_3b<M: SpiMaster + ?Sized>(master: &mut M, addr: u32, buf: &mut [u8]) -> Result<()> {
    let mut cmd = SpiCommand::read_3b(opcodes::READ, addr, buf);
    master.execute(&mut cmd)
}

/// Program a single page using 3-byte addressing
///
/// `data` must not cross a page boundary; the chip would wrap around
/// within the page.
pub fn program_page_3b<M, C>(master: &mut M, clock: &C, addr: u32, data: &[u8], timeout_ms: u32) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    write_enable(master)?;

    let mut cmd = SpiCommand::write_3b(opcodes::PP, addr, data);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, POLL_INTERVAL_US, timeout_ms)
}

/// Erase a sector/block at the given address
///
/// `opcode` selects the erase granularity (`SE_20` or `BE_D8`).
pub fn erase_block<M, C>(master: &mut M, clock: &C, opcode: u8, addr: u32, timeout_ms: u32) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    write_enable(master)?;

    let mut cmd = SpiCommand::erase_3b(opcode, addr);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, POLL_INTERVAL_US, timeout_ms)
}

/// Erase the entire chip
pub fn chip_erase<M, C>(master: &mut M, clock: &C, timeout_ms: u32) -> Result<()>
where
    M: SpiMaster + ?Sized,
    C: Clock + ?Sized,
{
    write_enable(master)?;

    let mut cmd = SpiCommand::simple(opcodes::CE_C7);
    master.execute(&mut cmd)?;

    wait_ready(master, clock, POLL_INTERVAL_US, timeout_ms)
}

/// Enter deep power-down
pub fn power_down<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::DP);
    master.execute(&mut cmd)
}

/// Release from deep power-down and wait for the chip to come back
pub fn release_power_down<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::RDP);
    master.execute(&mut cmd)?;
    master.delay_us(WAKE_UP_DELAY_US);
    Ok(())
}

/// Check if the chip is busy
pub fn is_busy<M: SpiMaster + ?Sized>(master: &mut M) -> Result<bool> {
    Ok(read_status(master)?.is_busy())
}
