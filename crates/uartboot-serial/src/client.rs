//! Host side of the bootloader protocol

use std::time::Duration;

use uartboot_core::boot::{
    crc16, Command, InfoRecord, Request, Transport, ACK, INFO_RECORD_LEN, IO_TIMEOUT,
    MAX_PAYLOAD_SIZE, NACK,
};

use crate::error::ClientError;

/// Result type for client operations
pub type Result<T> = core::result::Result<T, ClientError>;

/// Talks to a device running the bootloader
///
/// Every call sends one request and waits for the matching reply. The
/// deadline applies to each reply field separately; flash operations that
/// take long on the device (chip erase) need a larger one, see
/// [`set_timeout`](Self::set_timeout).
pub struct Client<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> Client<T> {
    /// Create a client with the protocol's default I/O deadline
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: IO_TIMEOUT,
        }
    }

    /// Change the reply deadline
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Current reply deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Query chip identity and geometry
    pub fn get_info(&mut self) -> Result<InfoRecord> {
        self.send(&Request::GetInfo)?;
        self.expect_ack(Command::GetInfo)?;
        let mut raw = [0u8; INFO_RECORD_LEN];
        self.transport.read(&mut raw, Some(self.timeout))?;
        InfoRecord::parse(&raw).ok_or(ClientError::BadInfo)
    }

    /// Program up to [`MAX_PAYLOAD_SIZE`] bytes at `address`
    ///
    /// The target range must already be erased.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(ClientError::EmptyPayload);
        }
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(ClientError::PayloadTooLarge(data.len()));
        }
        log::trace!("client: WRITE {} bytes at 0x{:06X}", data.len(), address);
        self.send(&Request::Write { address, data })?;
        self.expect_ack(Command::Write)
    }

    /// Read `buf.len()` bytes at `address`, checking the reply CRC
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Err(ClientError::EmptyPayload);
        }
        if buf.len() > MAX_PAYLOAD_SIZE {
            return Err(ClientError::PayloadTooLarge(buf.len()));
        }
        log::trace!("client: READ {} bytes at 0x{:06X}", buf.len(), address);
        self.send(&Request::Read {
            address,
            length: buf.len() as u32,
        })?;
        self.expect_ack(Command::Read)?;

        self.transport.read(buf, Some(self.timeout))?;
        let mut raw = [0u8; 2];
        self.transport.read(&mut raw, Some(self.timeout))?;
        let expected = u16::from_le_bytes(raw);
        let actual = crc16(buf);
        if expected != actual {
            return Err(ClientError::CrcMismatch { expected, actual });
        }
        Ok(())
    }

    /// Erase the sector containing `address`
    pub fn erase_sector(&mut self, address: u32) -> Result<()> {
        self.send(&Request::EraseSector { address })?;
        self.expect_ack(Command::EraseSector)
    }

    /// Erase the whole chip
    pub fn erase_chip(&mut self) -> Result<()> {
        self.send(&Request::EraseChip)?;
        self.expect_ack(Command::EraseChip)
    }

    fn send(&mut self, request: &Request<'_>) -> Result<()> {
        self.transport
            .write(request.header().as_bytes(), self.timeout)?;
        let payload = request.payload();
        if !payload.is_empty() {
            self.transport.write(payload, self.timeout)?;
        }
        if let Some(trailer) = request.trailer() {
            self.transport.write(&trailer, self.timeout)?;
        }
        self.transport.flush()?;
        Ok(())
    }

    fn expect_ack(&mut self, command: Command) -> Result<()> {
        let mut status = [0u8; 1];
        self.transport.read(&mut status, Some(self.timeout))?;
        match status[0] {
            ACK => Ok(()),
            NACK => Err(ClientError::Nack {
                command: command.name(),
            }),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }
}
