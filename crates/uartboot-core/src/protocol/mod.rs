//! Protocol implementations
//!
//! This module contains the SPI25 command sequences spoken to the flash
//! chip. The bootloader's serial protocol lives in [`crate::boot`].

mod spi25;

pub use spi25::*;
