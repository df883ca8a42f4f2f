//! Wire format of the bootloader protocol
//!
//! All multi-byte fields are little-endian.

use core::fmt;
use core::time::Duration;

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::checksum::crc16;
use crate::error::Error;
use crate::flash::Geometry;

/// Two bytes opening every request
pub const START_MARKER: [u8; 2] = [0xAA, 0x55];
/// Positive reply
pub const ACK: u8 = 0x79;
/// Negative reply
pub const NACK: u8 = 0x1F;

/// Largest payload of a single WRITE or READ
pub const MAX_PAYLOAD_SIZE: usize = 4096;
/// Largest single serial read while receiving a payload
pub const IO_CHUNK_SIZE: usize = 256;
/// Deadline for every field after the start marker
pub const IO_TIMEOUT: Duration = Duration::from_millis(5000);

/// Marker, command, length and address
pub const MAX_REQUEST_HEADER_LEN: usize = 2 + 1 + 4 + 4;
/// Size of the GET_INFO record
pub const INFO_RECORD_LEN: usize = 13;

/// Request command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Program a payload at an address
    Write = 0x01,
    /// Read back a range
    Read = 0x02,
    /// Erase the 4 KiB sector containing an address
    EraseSector = 0x03,
    /// Erase the whole chip
    EraseChip = 0x04,
    /// Report identity and geometry
    GetInfo = 0x05,
    /// Reserved; always answered with NACK
    Verify = 0x06,
}

impl Command {
    /// Wire code of this command
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short upper-case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Write => "WRITE",
            Self::Read => "READ",
            Self::EraseSector => "ERASE_SECTOR",
            Self::EraseChip => "ERASE_CHIP",
            Self::GetInfo => "GET_INFO",
            Self::Verify => "VERIFY",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0x01 => Ok(Self::Write),
            0x02 => Ok(Self::Read),
            0x03 => Ok(Self::EraseSector),
            0x04 => Ok(Self::EraseChip),
            0x05 => Ok(Self::GetInfo),
            0x06 => Ok(Self::Verify),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GET_INFO reply body
///
/// Byte layout: manufacturer, device, JEDEC[3], capacity u32, page size u16,
/// sector size u16.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct InfoRecord {
    /// REMS manufacturer ID
    pub manufacturer_id: u8,
    /// REMS device ID
    pub device_id: u8,
    /// RDID manufacturer, memory type, capacity code
    pub jedec_id: [u8; 3],
    /// Capacity in bytes
    pub capacity: U32,
    /// Page program size
    pub page_size: U16,
    /// Sector erase size
    pub sector_size: U16,
}

const _: () = assert!(core::mem::size_of::<InfoRecord>() == INFO_RECORD_LEN);

impl InfoRecord {
    /// Combine chip identity with its geometry
    pub fn new(ids: (u8, u8), jedec_id: [u8; 3], geometry: &Geometry) -> Self {
        Self {
            manufacturer_id: ids.0,
            device_id: ids.1,
            jedec_id,
            capacity: U32::new(geometry.total_size),
            page_size: U16::new(geometry.page_size as u16),
            sector_size: U16::new(geometry.sector_size as u16),
        }
    }

    /// Parse a received record
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }
}

/// Encoded request prefix, everything before the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    bytes: [u8; MAX_REQUEST_HEADER_LEN],
    len: usize,
}

impl RequestHeader {
    /// The encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// A host request, borrowed from the caller's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// WRITE: program `data` at `address`
    Write {
        /// Destination address
        address: u32,
        /// Payload, at most [`MAX_PAYLOAD_SIZE`] bytes
        data: &'a [u8],
    },
    /// READ: fetch `length` bytes at `address`
    Read {
        /// Source address
        address: u32,
        /// Number of bytes
        length: u32,
    },
    /// ERASE_SECTOR
    EraseSector {
        /// Any address inside the sector
        address: u32,
    },
    /// ERASE_CHIP
    EraseChip,
    /// GET_INFO
    GetInfo,
}

impl Request<'_> {
    /// Command code of this request
    pub fn command(&self) -> Command {
        match self {
            Self::Write { .. } => Command::Write,
            Self::Read { .. } => Command::Read,
            Self::EraseSector { .. } => Command::EraseSector,
            Self::EraseChip => Command::EraseChip,
            Self::GetInfo => Command::GetInfo,
        }
    }

    /// Marker, command and the LEN/ADDR fields the command carries
    pub fn header(&self) -> RequestHeader {
        let mut bytes = [0u8; MAX_REQUEST_HEADER_LEN];
        bytes[..2].copy_from_slice(&START_MARKER);
        bytes[2] = self.command().code();
        let mut len = 3;

        let mut push = |value: u32| {
            bytes[len..len + 4].copy_from_slice(&value.to_le_bytes());
            len += 4;
        };
        match *self {
            Self::Write { address, data } => {
                push(data.len() as u32);
                push(address);
            }
            Self::Read { address, length } => {
                push(length);
                push(address);
            }
            Self::EraseSector { address } => push(address),
            Self::EraseChip | Self::GetInfo => {}
        }

        RequestHeader { bytes, len }
    }

    /// Payload following the header (WRITE only)
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Write { data, .. } => data,
            _ => &[],
        }
    }

    /// CRC trailer following the payload (WRITE only)
    pub fn trailer(&self) -> Option<[u8; 2]> {
        match self {
            Self::Write { data, .. } => Some(crc16(data).to_le_bytes()),
            _ => None,
        }
    }
}
