//! Error types for the host side of the link

use thiserror::Error;

/// Errors opening or driving a host-side link
#[derive(Debug, Error)]
pub enum SerialError {
    /// Connection string could not be parsed
    #[error("Invalid connection string: {0}")]
    InvalidConnection(String),

    /// Failed to connect or accept
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by [`Client`](crate::Client)
#[derive(Debug, Error)]
pub enum ClientError {
    /// The device refused the request
    #[error("{command} rejected by device (NACK)")]
    Nack {
        /// Name of the refused command
        command: &'static str,
    },

    /// The device answered with neither ACK nor NACK
    #[error("Unexpected response 0x{0:02X}")]
    UnexpectedResponse(u8),

    /// READ data did not match its CRC
    #[error("Checksum mismatch on read: expected 0x{expected:04X}, computed 0x{actual:04X}")]
    CrcMismatch {
        /// CRC sent by the device
        expected: u16,
        /// CRC over the received data
        actual: u16,
    },

    /// Request larger than the device accepts
    #[error("Payload of {0} bytes exceeds the protocol limit")]
    PayloadTooLarge(usize),

    /// WRITE or READ of zero bytes
    #[error("Empty transfer")]
    EmptyPayload,

    /// Malformed GET_INFO record
    #[error("Malformed info record")]
    BadInfo,

    /// No reply within the deadline
    #[error("Timed out waiting for the device")]
    Timeout,

    /// Link failure below the protocol
    #[error("Link error: {0}")]
    Link(uartboot_core::Error),
}

impl From<uartboot_core::Error> for ClientError {
    fn from(e: uartboot_core::Error) -> Self {
        match e {
            uartboot_core::Error::Timeout => ClientError::Timeout,
            other => ClientError::Link(other),
        }
    }
}

/// Result type for host link setup
pub type Result<T> = core::result::Result<T, SerialError>;
