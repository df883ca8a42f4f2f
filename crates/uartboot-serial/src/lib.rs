//! uartboot-serial - Host-side links for the UART bootloader
//!
//! This crate provides std implementations of the bootloader's serial
//! [`Transport`] over a serial port or a TCP socket, and a [`Client`] that
//! speaks the protocol from the host side.
//!
//! # Supported Transports
//!
//! - Serial port: `dev=/dev/ttyUSB0`, `dev=COM3:921600`
//! - TCP socket: `ip=host:port` (e.g. a bootloader emulator)
//! - TCP listener: `listen=addr:port` (emulator side only)
//!
//! # Example
//!
//! ```no_run
//! use uartboot_serial::open_client;
//!
//! let mut client = open_client("dev=/dev/ttyUSB0:115200")?;
//! let info = client.get_info()?;
//! println!("capacity: {} bytes", info.capacity.get());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod error;
pub mod transport;

// Re-exports
pub use client::Client;
pub use error::{ClientError, Result, SerialError};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::DEFAULT_BAUD;
pub use uartboot_core::boot::Transport;

/// Parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for [`DEFAULT_BAUD`])
        baud: Option<u32>,
    },
    /// Outgoing TCP connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
    /// Incoming TCP connections on a local address
    Listen {
        /// Address to bind
        host: String,
        /// Port number
        port: u16,
    },
}

fn split_host_port(s: &str, key: &str) -> Result<(String, u16)> {
    let (host, port_str) = s
        .rsplit_once(':')
        .ok_or_else(|| SerialError::InvalidConnection(format!("Missing port in {}=", key)))?;
    let port = port_str
        .parse()
        .map_err(|_| SerialError::InvalidConnection(format!("Invalid port: {}", port_str)))?;
    Ok((host.to_string(), port))
}

impl Connection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    /// - `listen=addr:port` - TCP listener
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(dev) = s.strip_prefix("dev=") {
            if dev.is_empty() {
                return Err(SerialError::InvalidConnection(
                    "Empty device path".to_string(),
                ));
            }
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                let baud = baud_str.parse().map_err(|_| {
                    SerialError::InvalidConnection(format!("Invalid baud rate: {}", baud_str))
                })?;
                Ok(Connection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                })
            } else {
                Ok(Connection::Serial {
                    device: dev.to_string(),
                    baud: None,
                })
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port) = split_host_port(ip, "ip")?;
            Ok(Connection::Tcp { host, port })
        } else if let Some(addr) = s.strip_prefix("listen=") {
            let (host, port) = split_host_port(addr, "listen")?;
            Ok(Connection::Listen { host, port })
        } else {
            Err(SerialError::InvalidConnection(format!(
                "{}. Use dev=..., ip=... or listen=...",
                s
            )))
        }
    }
}

/// Transport selected at runtime from a connection string
pub enum AnyTransport {
    /// Serial port
    Serial(SerialTransport),
    /// TCP socket
    Tcp(TcpTransport),
}

impl Transport for AnyTransport {
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Option<std::time::Duration>,
    ) -> uartboot_core::Result<()> {
        match self {
            AnyTransport::Serial(t) => t.read(buf, timeout),
            AnyTransport::Tcp(t) => t.read(buf, timeout),
        }
    }

    fn write(&mut self, data: &[u8], timeout: std::time::Duration) -> uartboot_core::Result<()> {
        match self {
            AnyTransport::Serial(t) => t.write(data, timeout),
            AnyTransport::Tcp(t) => t.write(data, timeout),
        }
    }

    fn flush(&mut self) -> uartboot_core::Result<()> {
        match self {
            AnyTransport::Serial(t) => t.flush(),
            AnyTransport::Tcp(t) => t.flush(),
        }
    }
}

/// Open the host side of a link
///
/// `listen=` is refused here; the host always initiates.
pub fn open_transport(options: &str) -> Result<AnyTransport> {
    match Connection::parse(options)? {
        Connection::Serial { device, baud } => {
            Ok(AnyTransport::Serial(SerialTransport::open(&device, baud)?))
        }
        Connection::Tcp { host, port } => Ok(AnyTransport::Tcp(TcpTransport::connect(&host, port)?)),
        Connection::Listen { .. } => Err(SerialError::InvalidConnection(
            "listen= is only valid for the emulator".to_string(),
        )),
    }
}

/// Open a link and wrap it in a protocol [`Client`]
pub fn open_client(options: &str) -> Result<Client<AnyTransport>> {
    open_transport(options).map(Client::new)
}
