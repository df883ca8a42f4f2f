//! Programmer traits and abstractions
//!
//! This module defines the raw transport the flash driver is written
//! against, plus an adapter that builds it from a plain SPI peripheral and
//! a chip-select line.

mod bus;
mod traits;

pub use bus::{SelectedBus, DEFAULT_EXCHANGE_TIMEOUT_MS};
pub use traits::*;
