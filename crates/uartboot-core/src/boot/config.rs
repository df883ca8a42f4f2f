//! Engine configuration

use core::time::Duration;

use super::packet::{IO_CHUNK_SIZE, IO_TIMEOUT, MAX_PAYLOAD_SIZE};
use crate::error::{Error, Result};

/// Tunables of the protocol engine
///
/// The default is the reference configuration. A host must agree on
/// `max_payload`; the other two only affect the device side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Largest accepted LEN field
    pub max_payload: usize,
    /// Largest single transport read while receiving a payload
    pub io_chunk: usize,
    /// Deadline for each field read after the start marker
    pub io_timeout: Duration,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            max_payload: MAX_PAYLOAD_SIZE,
            io_chunk: IO_CHUNK_SIZE,
            io_timeout: IO_TIMEOUT,
        }
    }
}

impl BootConfig {
    /// Check the configuration fits the engine's scratch buffer
    pub fn validate(&self) -> Result<()> {
        if self.max_payload == 0 || self.max_payload > MAX_PAYLOAD_SIZE || self.io_chunk == 0 {
            return Err(Error::InvalidLength);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_reference() {
        let config = BootConfig::default();
        assert_eq!(config.max_payload, 4096);
        assert_eq!(config.io_chunk, 256);
        assert_eq!(config.io_timeout, Duration::from_secs(5));
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let config = BootConfig {
            max_payload: MAX_PAYLOAD_SIZE + 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidLength));

        let config = BootConfig {
            io_chunk: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidLength));
    }
}
