//! UART bootloader protocol
//!
//! The host sends framed requests over a serial link; the [`Bootloader`]
//! engine validates them, drives a [`FlashDevice`](crate::flash::FlashDevice)
//! and answers with ACK/NACK plus optional data.
//!
//! ```text
//! AA 55 CMD [LEN u32 LE] [ADDR u32 LE] [PAYLOAD] [CRC16 u16 LE]  ->  79 | 1F [DATA]
//! ```

mod checksum;
mod config;
mod engine;
mod packet;
mod transport;

pub use checksum::{crc16, CRC16};
pub use config::BootConfig;
pub use engine::{BootStats, Bootloader, Cycle};
pub use packet::*;
pub use transport::Transport;
