//! Serial port and TCP implementations of the bootloader transport
//!
//! Both transports block. A read without a deadline keeps re-arming a short
//! OS timeout until the buffer is full or the link goes away.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use uartboot_core::boot::Transport;
use uartboot_core::error::{Error, Result as LinkResult};

/// Default baud rate when the connection string does not name one
pub const DEFAULT_BAUD: u32 = 115_200;

/// OS timeout slice used while waiting without a deadline
const IDLE_SLICE: Duration = Duration::from_millis(500);

/// Classify an I/O failure for the protocol layer
fn link_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected => Error::Disconnected,
        _ => {
            log::error!("link I/O error: {}", e);
            Error::TransportError
        }
    }
}

/// Byte stream with an adjustable blocking timeout
trait TimedStream: Read + Write {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Fill `buf` completely, giving up at the deadline
fn read_until<S: TimedStream>(
    stream: &mut S,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> LinkResult<()> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut filled = 0;

    while filled < buf.len() {
        let slice = match deadline {
            Some(d) => {
                let left = d.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(Error::Timeout);
                }
                left
            }
            None => IDLE_SLICE,
        };
        stream.set_timeout(slice).map_err(link_error)?;

        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::Disconnected),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => match link_error(e) {
                Error::Timeout => {}
                other => return Err(other),
            },
        }
    }
    Ok(())
}

fn write_within<S: TimedStream>(stream: &mut S, data: &[u8], timeout: Duration) -> LinkResult<()> {
    stream.set_timeout(timeout).map_err(link_error)?;
    stream.write_all(data).map_err(link_error)
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::Result;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

    struct Port(Box<dyn SerialPort>);

    impl Read for Port {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Write for Port {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.write(data)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }

    impl TimedStream for Port {
        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.0.set_timeout(timeout).map_err(io::Error::from)
        }
    }

    /// Serial port transport, 8N1 without flow control
    pub struct SerialTransport {
        port: Port,
        name: String,
    }

    impl SerialTransport {
        /// Open a serial port, at [`DEFAULT_BAUD`] unless a rate is given
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(IDLE_SLICE)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self {
                port: Port(port),
                name: device.to_string(),
            })
        }

        /// Device path this transport was opened on
        pub fn name(&self) -> &str {
            &self.name
        }
    }

    impl Transport for SerialTransport {
        fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> LinkResult<()> {
            read_until(&mut self.port, buf, timeout)
        }

        fn write(&mut self, data: &[u8], timeout: Duration) -> LinkResult<()> {
            write_within(&mut self.port, data, timeout)
        }

        fn flush(&mut self) -> LinkResult<()> {
            self.port.flush().map_err(link_error)
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use crate::error::{Result, SerialError};
    use std::net::{SocketAddr, TcpListener, TcpStream};

    impl TimedStream for TcpStream {
        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.set_read_timeout(Some(timeout))?;
            self.set_write_timeout(Some(timeout))
        }
    }

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
        peer: Option<SocketAddr>,
    }

    impl TcpTransport {
        /// Connect to a bootloader (or emulator) listening on `host:port`
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", addr, e)))?;
            let transport = Self::from_stream(stream)?;

            log::info!("Connected to {}", addr);
            Ok(transport)
        }

        /// Wait for the next client on `listener`
        pub fn accept(listener: &TcpListener) -> Result<Self> {
            let (stream, peer) = listener.accept()?;
            log::info!("Accepted connection from {}", peer);
            Self::from_stream(stream)
        }

        /// Wrap an already connected stream
        pub fn from_stream(stream: TcpStream) -> Result<Self> {
            stream.set_nodelay(true).map_err(|e| {
                SerialError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            let peer = stream.peer_addr().ok();
            Ok(Self { stream, peer })
        }

        /// Remote end of the connection, if known
        pub fn peer(&self) -> Option<SocketAddr> {
            self.peer
        }
    }

    impl Transport for TcpTransport {
        fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> LinkResult<()> {
            read_until(&mut self.stream, buf, timeout)
        }

        fn write(&mut self, data: &[u8], timeout: Duration) -> LinkResult<()> {
            write_within(&mut self.stream, data, timeout)
        }

        fn flush(&mut self) -> LinkResult<()> {
            self.stream.flush().map_err(link_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory stream that times out once its data runs dry
    struct Trickle {
        data: Vec<u8>,
        per_read: usize,
        closed: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                if self.closed {
                    return Ok(0);
                }
                return Err(io::Error::new(io::ErrorKind::TimedOut, "idle"));
            }
            let n = buf.len().min(self.per_read).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl TimedStream for Trickle {
        fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_reads_are_joined() {
        let mut s = Trickle {
            data: vec![1, 2, 3, 4, 5],
            per_read: 2,
            closed: false,
        };
        let mut buf = [0u8; 5];
        read_until(&mut s, &mut buf, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_deadline_expires() {
        let mut s = Trickle {
            data: vec![1],
            per_read: 1,
            closed: false,
        };
        let mut buf = [0u8; 2];
        assert_eq!(
            read_until(&mut s, &mut buf, Some(Duration::from_millis(20))),
            Err(Error::Timeout)
        );
    }

    #[test]
    fn test_eof_is_disconnect() {
        let mut s = Trickle {
            data: vec![],
            per_read: 1,
            closed: true,
        };
        let mut buf = [0u8; 1];
        assert_eq!(read_until(&mut s, &mut buf, None), Err(Error::Disconnected));
    }

    #[test]
    fn test_error_classification() {
        let kind = |k| link_error(io::Error::new(k, "x"));
        assert_eq!(kind(io::ErrorKind::TimedOut), Error::Timeout);
        assert_eq!(kind(io::ErrorKind::BrokenPipe), Error::Disconnected);
        assert_eq!(kind(io::ErrorKind::UnexpectedEof), Error::Disconnected);
        assert_eq!(kind(io::ErrorKind::PermissionDenied), Error::TransportError);
    }
}
