//! Status register 1 snapshot

use bitflags::bitflags;

use crate::spi::opcodes;

bitflags! {
    /// Status register 1 as returned by RDSR (0x05)
    ///
    /// This is a point-in-time snapshot. It is re-read on every poll and
    /// never cached across operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Erase or program in progress
        const BUSY = opcodes::SR1_WIP;
        /// Write enable latch
        const WEL  = opcodes::SR1_WEL;
        /// Block protect bit 0
        const BP0  = 0x04;
        /// Block protect bit 1
        const BP1  = 0x08;
        /// Block protect bit 2
        const BP2  = 0x10;
        /// Top/bottom protect
        const TB   = 0x20;
        /// Sector/block protect
        const SEC  = 0x40;
        /// Status register protect 0
        const SRP0 = 0x80;
    }
}

impl StatusRegister {
    /// Returns true while a program or erase is in progress
    pub const fn is_busy(&self) -> bool {
        self.contains(Self::BUSY)
    }

    /// Returns true if the write enable latch is set
    pub const fn write_enabled(&self) -> bool {
        self.contains(Self::WEL)
    }
}
