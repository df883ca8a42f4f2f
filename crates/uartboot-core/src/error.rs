//! Error types for uartboot-core
//!
//! This module provides a no_std compatible error type that is shared by
//! the flash driver and the bootloader engine.

use core::fmt;

/// Coarse classification of an [`Error`]
///
/// The wire protocol only carries ACK/NACK, so this is as much detail as
/// the host could ever learn. It is still useful for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Hardware exchange failed or input out of range
    Generic,
    /// The peripheral reported itself busy
    Busy,
    /// An I/O or busy-poll deadline expired
    Timeout,
    /// Payload CRC disagreement
    ChecksumMismatch,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Raw transport errors
    /// SPI transfer failed
    TransferFailed,
    /// SPI peripheral is busy
    Busy,

    // Flash errors
    /// Operation timed out (busy poll or serial deadline)
    Timeout,
    /// Address or range is beyond the flash chip size
    AddressOutOfBounds,
    /// Length is zero or larger than the operation allows
    InvalidLength,
    /// Geometry parameters are inconsistent
    InvalidGeometry,

    // Protocol errors
    /// Payload checksum did not match
    ChecksumMismatch {
        /// CRC carried by the packet
        expected: u16,
        /// CRC computed over the received payload
        actual: u16,
    },
    /// Command code is not part of the protocol
    UnknownCommand(u8),
    /// Command is declared by the protocol but not implemented
    UnsupportedCommand(u8),
    /// Peer sent a byte that is neither ACK nor NACK
    UnexpectedResponse(u8),

    // Serial link errors
    /// Serial transport failed
    TransportError,
    /// Serial link was closed by the peer
    Disconnected,
}

impl Error {
    /// Map this error onto the protocol's error taxonomy
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy => ErrorKind::Busy,
            Self::Timeout => ErrorKind::Timeout,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            _ => ErrorKind::Generic,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "error"),
            Self::Busy => write!(f, "busy"),
            Self::Timeout => write!(f, "timeout"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransferFailed => write!(f, "SPI transfer failed"),
            Self::Busy => write!(f, "SPI peripheral busy"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidLength => write!(f, "invalid length"),
            Self::InvalidGeometry => write!(f, "invalid flash geometry"),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: expected 0x{:04X}, computed 0x{:04X}",
                expected, actual
            ),
            Self::UnknownCommand(code) => write!(f, "unknown command 0x{:02X}", code),
            Self::UnsupportedCommand(code) => {
                write!(f, "command 0x{:02X} is not implemented", code)
            }
            Self::UnexpectedResponse(byte) => write!(f, "unexpected response 0x{:02X}", byte),
            Self::TransportError => write!(f, "serial transport error"),
            Self::Disconnected => write!(f, "serial link closed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
