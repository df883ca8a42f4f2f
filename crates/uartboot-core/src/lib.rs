//! uartboot-core - Core library for the UART SPI-flash bootloader
//!
//! This crate contains everything that runs on the microcontroller side:
//! the SPI NOR flash driver and the serial bootloader protocol engine.
//! It is `no_std` and allocation free so it can be linked into firmware.
//!
//! # Layers
//!
//! - [`spi`] / [`programmer`] - SPI command model and the raw transport
//!   traits (`SpiMaster`, `SpiBus` + `ChipSelect`, `Clock`)
//! - [`protocol`] - SPI25 chip command sequences (identify, status, program,
//!   erase, power control)
//! - [`flash`] - geometry, status register and the geometry-parameterized
//!   `FlashDriver`
//! - [`boot`] - CRC16, packet model, serial transport trait and the
//!   bootloader protocol engine
//!
//! # Features
//!
//! - `std` - Enable standard library support (`StdClock`, `std::error::Error`)
//!
//! # Example
//!
//! ```ignore
//! use uartboot_core::boot::Bootloader;
//! use uartboot_core::flash::{FlashDriver, Geometry};
//!
//! fn firmware_main<M: SpiMaster, C: Clock, T: Transport>(spi: M, clock: C, uart: T) -> ! {
//!     let mut flash = FlashDriver::new(spi, clock, Geometry::W25Q128);
//!     flash.init().ok();
//!     let mut boot = Bootloader::new(uart, flash);
//!     loop {
//!         boot.process();
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod boot;
pub mod error;
pub mod flash;
pub mod programmer;
pub mod protocol;
pub mod spi;

pub use error::{Error, ErrorKind, Result};
