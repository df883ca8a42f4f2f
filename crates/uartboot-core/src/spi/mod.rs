//! SPI types and command structures
//!
//! This module provides types for representing single-I/O SPI transactions
//! and the JEDEC opcodes used by the flash driver.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::{SpiCommand, MAX_HEADER_LEN};
pub use opcodes::*;
