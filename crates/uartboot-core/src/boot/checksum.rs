//! Payload checksum

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/IBM-3740 (CCITT-FALSE): poly 0x1021, init 0xFFFF, no reflection,
/// no final XOR
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Checksum of a complete payload
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
