//! Chip-select framing on top of a plain SPI peripheral

use super::{ChipSelect, SpiBus, SpiMaster};
use crate::error::Result;
use crate::spi::{SpiCommand, MAX_HEADER_LEN};

/// Timeout handed to every transmit/receive call
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u32 = 1000;

/// Releases chip select when dropped
struct CsGuard<'a, CS: ChipSelect> {
    cs: &'a mut CS,
}

impl<'a, CS: ChipSelect> CsGuard<'a, CS> {
    fn assert(cs: &'a mut CS) -> Self {
        cs.select();
        Self { cs }
    }
}

impl<CS: ChipSelect> Drop for CsGuard<'_, CS> {
    fn drop(&mut self) {
        self.cs.deselect();
    }
}

/// [`SpiMaster`] built from an [`SpiBus`] and its [`ChipSelect`] line
///
/// Each command is sent as one select/transmit/receive/deselect exchange.
/// If any phase fails the remaining phases are skipped, but chip select is
/// still released.
#[derive(Debug)]
pub struct SelectedBus<B, CS> {
    bus: B,
    cs: CS,
    timeout_ms: u32,
}

impl<B: SpiBus, CS: ChipSelect> SelectedBus<B, CS> {
    /// Bind a bus to its chip-select line, deselecting it first
    pub fn new(bus: B, mut cs: CS) -> Self {
        cs.deselect();
        Self {
            bus,
            cs,
            timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
        }
    }

    /// Give back the bus and chip-select line
    pub fn release(self) -> (B, CS) {
        (self.bus, self.cs)
    }
}

impl<B: SpiBus, CS: ChipSelect> SpiMaster for SelectedBus<B, CS> {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let Self {
            bus,
            cs,
            timeout_ms,
        } = self;

        let mut header = [0u8; MAX_HEADER_LEN];
        let header_len = cmd.encode_header(&mut header);

        let _guard = CsGuard::assert(cs);
        bus.transmit(&header[..header_len], *timeout_ms)?;
        if cmd.has_write() {
            bus.transmit(cmd.write_data, *timeout_ms)?;
        }
        if cmd.has_read() {
            bus.receive(cmd.read_buf, *timeout_ms)?;
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.bus.delay_us(us)
    }
}
