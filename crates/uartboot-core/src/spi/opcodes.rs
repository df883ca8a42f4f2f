//! Standard JEDEC SPI flash opcodes
//!
//! Only the single-I/O, 3-byte-address subset understood by the
//! W25Qxx family is listed here.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + memory type + capacity)
pub const RDID: u8 = 0x9F;
/// Read Electronic Manufacturer & Device ID (legacy)
pub const REMS: u8 = 0x90;

// ============================================================================
// Read / program
// ============================================================================

/// Read Data
pub const READ: u8 = 0x03;
/// Page Program
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase (4 KiB)
pub const SE_20: u8 = 0x20;
/// Block Erase (64 KiB)
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power Down
pub const RDP: u8 = 0xAB;

// ============================================================================
// Status register bits
// ============================================================================

/// Status Register 1: Write In Progress (busy)
pub const SR1_WIP: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
