//! In-memory serial links

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use uartboot_core::boot::{Request, Transport};
use uartboot_core::error::{Error, Result};

/// Serial link fed from a prepared byte script
///
/// Reads are served from the script. A read the script cannot satisfy
/// fails with `Timeout` if it has a deadline and with `Disconnected` if it
/// would wait forever, so a drive loop ends once the script is consumed.
/// Everything written is captured.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    input: VecDeque<u8>,
    output: Vec<u8>,
    reads: Vec<usize>,
}

impl ScriptedLink {
    /// An empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes
    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.input.extend(bytes);
        self
    }

    /// Queue a complete, well-formed request
    pub fn push_request(&mut self, request: &Request<'_>) -> &mut Self {
        self.push(request.header().as_bytes());
        self.push(request.payload());
        if let Some(trailer) = request.trailer() {
            self.push(&trailer);
        }
        self
    }

    /// Bytes written by the engine so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take and clear the captured output
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Size of every read request, in order
    pub fn read_sizes(&self) -> &[usize] {
        &self.reads
    }

    /// Unconsumed script bytes
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl Transport for ScriptedLink {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<()> {
        self.reads.push(buf.len());
        if self.input.len() < buf.len() {
            return Err(match timeout {
                Some(_) => Error::Timeout,
                None => Error::Disconnected,
            });
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.input.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8], _timeout: Duration) -> Result<()> {
        self.output.extend_from_slice(data);
        Ok(())
    }
}

/// One end of an in-process duplex link, see [`pipe`]
pub struct PipeEnd {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

/// Create a connected pair of serial links
///
/// Each end can be moved to its own thread. Dropping one end makes reads
/// on the other fail with `Disconnected` once buffered data is consumed.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    (
        PipeEnd {
            tx: a_tx,
            rx: a_rx,
            pending: VecDeque::new(),
        },
        PipeEnd {
            tx: b_tx,
            rx: b_rx,
            pending: VecDeque::new(),
        },
    )
}

impl PipeEnd {
    fn fill(&mut self, timeout: Option<Duration>) -> Result<()> {
        let chunk = match timeout {
            Some(t) => self.rx.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout,
                RecvTimeoutError::Disconnected => Error::Disconnected,
            })?,
            None => self.rx.recv().map_err(|_| Error::Disconnected)?,
        };
        self.pending.extend(chunk);
        Ok(())
    }
}

impl Transport for PipeEnd {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        while self.pending.len() < buf.len() {
            let left = match deadline {
                Some(d) => Some(d.saturating_duration_since(std::time::Instant::now())),
                None => None,
            };
            if left == Some(Duration::ZERO) {
                return Err(Error::Timeout);
            }
            self.fill(left)?;
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8], _timeout: Duration) -> Result<()> {
        self.tx.send(data.to_vec()).map_err(|_| Error::Disconnected)
    }
}
