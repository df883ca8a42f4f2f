//! SPI NOR flash driver
//!
//! This module turns byte-range read/write/erase requests into chip-level
//! page, sector and block operations.

mod device;
mod driver;
mod geometry;
mod status;

pub use device::FlashDevice;
pub use driver::{FlashDriver, PollTimeouts};
pub use geometry::{Geometry, PageChunk, PageChunks};
pub use status::StatusRegister;
