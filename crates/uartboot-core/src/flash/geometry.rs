//! Flash geometry and page splitting

use crate::error::{Error, Result};
use crate::spi::AddressWidth;

/// Physical layout of a flash chip
///
/// Immutable once constructed. `sector_size` and `block_size` are always
/// multiples of `page_size`, and `total_size` fits a 3-byte address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Largest unit a single page program may touch
    pub page_size: u32,
    /// Smallest erasable unit (SE, 0x20)
    pub sector_size: u32,
    /// 64 KiB block erase unit (BE, 0xD8)
    pub block_size: u32,
    /// Capacity in bytes
    pub total_size: u32,
}

impl Geometry {
    /// Winbond W25Q64: 8 MiB
    pub const W25Q64: Self = Self {
        page_size: 256,
        sector_size: 4096,
        block_size: 65536,
        total_size: 8 * 1024 * 1024,
    };

    /// Winbond W25Q128: 16 MiB
    pub const W25Q128: Self = Self {
        page_size: 256,
        sector_size: 4096,
        block_size: 65536,
        total_size: 16 * 1024 * 1024,
    };

    /// Build a custom geometry, checking it for consistency
    ///
    /// Fails with `InvalidGeometry` unless the page size is a power of two,
    /// sector and block sizes are non-zero multiples of the page size, the
    /// sector size fits the 16-bit field of the info record, and the total
    /// size is a non-zero multiple of the sector size reachable with a
    /// 3-byte address.
    pub fn new(page_size: u32, sector_size: u32, block_size: u32, total_size: u32) -> Result<Self> {
        let geometry = Self {
            page_size,
            sector_size,
            block_size,
            total_size,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check the invariants documented on [`Geometry::new`]
    pub fn validate(&self) -> Result<()> {
        let ok = self.page_size.is_power_of_two()
            && self.sector_size != 0
            && self.sector_size % self.page_size == 0
            && self.sector_size <= u16::MAX as u32
            && self.block_size != 0
            && self.block_size % self.page_size == 0
            && self.total_size != 0
            && self.total_size % self.sector_size == 0
            && self.total_size <= AddressWidth::ThreeByte.max_size();
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidGeometry)
        }
    }

    /// Check `addr < total_size` and `addr + len <= total_size`
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        // u64 so that huge lengths cannot wrap
        let end = addr as u64 + len as u64;
        addr < self.total_size && end <= self.total_size as u64
    }

    /// Check that `addr` lies inside the chip
    pub fn contains(&self, addr: u32) -> bool {
        addr < self.total_size
    }

    /// Split `[addr, addr + len)` into page-program sized chunks
    pub fn page_chunks(&self, addr: u32, len: usize) -> PageChunks {
        PageChunks {
            page_size: self.page_size,
            address: addr,
            offset: 0,
            remaining: len,
        }
    }

    /// Number of whole sectors on the chip
    pub fn sector_count(&self) -> u32 {
        self.total_size / self.sector_size
    }
}

/// One page program: `len` bytes of the source at `offset`, to `address`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Destination flash address
    pub address: u32,
    /// Offset into the caller's buffer
    pub offset: usize,
    /// Number of bytes, never crossing a page boundary
    pub len: usize,
}

/// Iterator returned by [`Geometry::page_chunks`]
///
/// The first chunk runs up to the next page boundary, every following
/// chunk is a full page except possibly the last.
#[derive(Debug, Clone)]
pub struct PageChunks {
    page_size: u32,
    address: u32,
    offset: usize,
    remaining: usize,
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let to_boundary = (self.page_size - self.address % self.page_size) as usize;
        let len = to_boundary.min(self.remaining);
        let chunk = PageChunk {
            address: self.address,
            offset: self.offset,
            len,
        };
        self.address = self.address.wrapping_add(len as u32);
        self.offset += len;
        self.remaining -= len;
        Some(chunk)
    }
}
