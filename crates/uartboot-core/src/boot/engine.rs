//! Bootloader protocol engine

use core::convert::Infallible;

use zerocopy::IntoBytes;

use super::checksum::crc16;
use super::config::BootConfig;
use super::packet::{Command, InfoRecord, ACK, MAX_PAYLOAD_SIZE, NACK, START_MARKER};
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::flash::FlashDevice;

/// Outcome of one [`Bootloader::process`] call
///
/// Purely informational: the host only ever sees ACK or NACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// No valid start marker; nothing was sent
    Resync,
    /// The command succeeded and was acknowledged
    Acked(Command),
    /// A NACK was sent
    Nacked {
        /// The command, if the command byte was received and known
        command: Option<Command>,
        /// Why the request was refused
        reason: Error,
    },
    /// The transport reported the link gone
    LinkClosed,
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootStats {
    /// Payload bytes committed by WRITE
    pub bytes_written: u64,
    /// Payload bytes returned by READ
    pub bytes_read: u64,
    /// Requests answered with ACK
    pub acked: u32,
    /// Requests answered with NACK
    pub nacked: u32,
}

/// What to send after a successful handler
enum Reply {
    Ack,
    /// ACK, then `len` bytes of the scratch buffer and their CRC
    Data(usize),
    Info(InfoRecord),
}

/// UART bootloader session
///
/// Owns the serial transport, the flash device and a payload-sized scratch
/// buffer. Each [`process`](Self::process) call handles at most one
/// request; nothing happens between calls.
pub struct Bootloader<T, D> {
    transport: T,
    flash: D,
    config: BootConfig,
    buffer: [u8; MAX_PAYLOAD_SIZE],
    stats: BootStats,
}

impl<T: Transport, D: FlashDevice> Bootloader<T, D> {
    /// Create a session with the reference configuration
    pub fn new(transport: T, flash: D) -> Self {
        Self {
            transport,
            flash,
            config: BootConfig::default(),
            buffer: [0; MAX_PAYLOAD_SIZE],
            stats: BootStats::default(),
        }
    }

    /// Create a session with a custom configuration
    pub fn with_config(transport: T, flash: D, config: BootConfig) -> Result<Self> {
        config.validate()?;
        let mut boot = Self::new(transport, flash);
        boot.config = config;
        Ok(boot)
    }

    /// Get the active configuration
    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Get the session counters
    pub fn stats(&self) -> &BootStats {
        &self.stats
    }

    /// Get a reference to the flash device
    pub fn flash(&self) -> &D {
        &self.flash
    }

    /// Get a mutable reference to the flash device
    pub fn flash_mut(&mut self) -> &mut D {
        &mut self.flash
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tear down the session
    pub fn into_inner(self) -> (T, D) {
        (self.transport, self.flash)
    }

    /// Serve requests until the link goes away
    ///
    /// A UART never reports `Disconnected`, so on a device this never
    /// returns.
    pub fn run(&mut self) -> Result<Infallible> {
        loop {
            if self.process() == Cycle::LinkClosed {
                log::info!(
                    "boot: link closed ({} bytes written, {} bytes read)",
                    self.stats.bytes_written,
                    self.stats.bytes_read
                );
                return Err(Error::Disconnected);
            }
        }
    }

    /// Handle one request
    ///
    /// Waits indefinitely for the start marker, then applies the I/O
    /// deadline to every following field.
    pub fn process(&mut self) -> Cycle {
        let mut marker = [0u8; 2];
        match self.transport.read(&mut marker, None) {
            Ok(()) => {}
            Err(Error::Disconnected) => return Cycle::LinkClosed,
            Err(e) => {
                log::trace!("boot: sync read failed: {}", e);
                return Cycle::Resync;
            }
        }
        if marker != START_MARKER {
            log::trace!("boot: dropping {:02X} {:02X}", marker[0], marker[1]);
            return Cycle::Resync;
        }

        let mut code = [0u8; 1];
        if let Err(e) = self.transport.read(&mut code, Some(self.config.io_timeout)) {
            return self.refuse(None, e);
        }
        let command = match Command::try_from(code[0]) {
            Ok(command) => command,
            Err(e) => return self.refuse(None, e),
        };

        let outcome = match command {
            Command::Write => self.handle_write(),
            Command::Read => self.handle_read(),
            Command::EraseSector => self.handle_erase_sector(),
            Command::EraseChip => self.handle_erase_chip(),
            Command::GetInfo => self.handle_get_info(),
            Command::Verify => Err(Error::UnsupportedCommand(command.code())),
        };

        match outcome {
            Ok(reply) => self.accept(command, reply),
            Err(e) => self.refuse(Some(command), e),
        }
    }

    fn accept(&mut self, command: Command, reply: Reply) -> Cycle {
        self.stats.acked = self.stats.acked.wrapping_add(1);
        match self.send_reply(reply) {
            Ok(()) => {
                log::debug!("boot: {} ok", command);
                Cycle::Acked(command)
            }
            Err(Error::Disconnected) => Cycle::LinkClosed,
            Err(e) => {
                log::warn!("boot: {} reply not delivered: {}", command, e);
                Cycle::Acked(command)
            }
        }
    }

    fn refuse(&mut self, command: Option<Command>, reason: Error) -> Cycle {
        if reason == Error::Disconnected {
            return Cycle::LinkClosed;
        }
        match command {
            Some(command) => log::warn!("boot: NACK {}: {}", command, reason),
            None => log::warn!("boot: NACK: {}", reason),
        }
        self.stats.nacked = self.stats.nacked.wrapping_add(1);
        let sent = self
            .transport
            .write(&[NACK], self.config.io_timeout)
            .and_then(|()| self.transport.flush());
        match sent {
            Err(Error::Disconnected) => Cycle::LinkClosed,
            _ => Cycle::Nacked { command, reason },
        }
    }

    fn send_reply(&mut self, reply: Reply) -> Result<()> {
        let timeout = self.config.io_timeout;
        self.transport.write(&[ACK], timeout)?;
        match reply {
            Reply::Ack => {}
            Reply::Data(len) => {
                let data = &self.buffer[..len];
                self.transport.write(data, timeout)?;
                self.transport.write(&crc16(data).to_le_bytes(), timeout)?;
                self.stats.bytes_read += len as u64;
            }
            Reply::Info(record) => self.transport.write(record.as_bytes(), timeout)?,
        }
        self.transport.flush()
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        self.transport.read(&mut raw, Some(self.config.io_timeout))?;
        Ok(u32::from_le_bytes(raw))
    }

    /// LEN field, rejected if zero or above the payload limit
    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        if len == 0 || len > self.config.max_payload {
            return Err(Error::InvalidLength);
        }
        Ok(len)
    }

    fn handle_write(&mut self) -> Result<Reply> {
        let len = self.read_length()?;
        let address = self.read_u32()?;

        for chunk in self.buffer[..len].chunks_mut(self.config.io_chunk) {
            self.transport.read(chunk, Some(self.config.io_timeout))?;
        }

        let mut raw = [0u8; 2];
        self.transport.read(&mut raw, Some(self.config.io_timeout))?;
        let expected = u16::from_le_bytes(raw);
        let actual = crc16(&self.buffer[..len]);
        if expected != actual {
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        if !self.flash.is_valid_range(address, len) {
            return Err(Error::AddressOutOfBounds);
        }
        log::debug!("boot: WRITE {} bytes at 0x{:06X}", len, address);
        self.flash.write(address, &self.buffer[..len])?;
        self.stats.bytes_written += len as u64;
        Ok(Reply::Ack)
    }

    fn handle_read(&mut self) -> Result<Reply> {
        let len = self.read_length()?;
        let address = self.read_u32()?;

        if !self.flash.is_valid_range(address, len) {
            return Err(Error::AddressOutOfBounds);
        }
        log::debug!("boot: READ {} bytes at 0x{:06X}", len, address);
        self.flash.read(address, &mut self.buffer[..len])?;
        Ok(Reply::Data(len))
    }

    fn handle_erase_sector(&mut self) -> Result<Reply> {
        let address = self.read_u32()?;

        if !self.flash.geometry().contains(address) {
            return Err(Error::AddressOutOfBounds);
        }
        log::debug!("boot: ERASE_SECTOR at 0x{:06X}", address);
        self.flash.erase_sector(address)?;
        Ok(Reply::Ack)
    }

    fn handle_erase_chip(&mut self) -> Result<Reply> {
        log::debug!("boot: ERASE_CHIP");
        self.flash.erase_chip()?;
        Ok(Reply::Ack)
    }

    fn handle_get_info(&mut self) -> Result<Reply> {
        let ids = self.flash.identify()?;
        let jedec = self.flash.identify_jedec()?;
        Ok(Reply::Info(InfoRecord::new(ids, jedec, self.flash.geometry())))
    }
}
