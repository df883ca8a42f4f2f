//! Address width types

/// Address width for SPI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::ThreeByte => 3,
        }
    }

    /// Returns the maximum addressable size in bytes
    pub const fn max_size(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::ThreeByte => 16 * 1024 * 1024,
        }
    }

    /// Encode an address into `buf`, most significant byte first
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        match self {
            Self::None => {}
            Self::ThreeByte => {
                buf[0] = (address >> 16) as u8;
                buf[1] = (address >> 8) as u8;
                buf[2] = address as u8;
            }
        }
    }
}
