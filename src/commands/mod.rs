//! CLI command implementations
//!
//! Host commands (`info`, `write`, `read`, `verify`, `erase`) talk to a
//! device through [`uartboot_serial::Client`]. `serve` is the device side:
//! it runs the bootloader engine against the in-memory chip.

pub mod erase;
pub mod info;
pub mod read;
pub mod serve;
pub mod verify;
pub mod write;

use indicatif::{ProgressBar, ProgressStyle};
use uartboot_core::boot::{InfoRecord, MAX_PAYLOAD_SIZE};
use uartboot_serial::{open_client, AnyTransport, Client};

/// Bytes moved per request; the protocol's payload limit
pub const CHUNK_SIZE: usize = MAX_PAYLOAD_SIZE;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the link and ask the device what it is
pub fn connect(port: &str) -> CmdResult<(Client<AnyTransport>, InfoRecord)> {
    let mut client = open_client(port)?;
    let info = client.get_info()?;
    log::info!(
        "Device: JEDEC {:02X} {:02X} {:02X}, {} bytes",
        info.jedec_id[0],
        info.jedec_id[1],
        info.jedec_id[2],
        info.capacity.get()
    );
    Ok((client, info))
}

/// Byte progress bar labelled with `phase`
pub fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Check that `len` bytes at `address` fit in the reported capacity
pub fn check_range(info: &InfoRecord, address: u32, len: usize) -> CmdResult {
    let capacity = info.capacity.get() as u64;
    let end = address as u64 + len as u64;
    if end > capacity {
        return Err(format!(
            "Range 0x{:08X}..0x{:08X} is outside chip bounds (0x{:08X})",
            address, end, capacity
        )
        .into());
    }
    Ok(())
}

/// Read `buf.len()` bytes starting at `address`, one request per chunk
pub fn read_range(
    client: &mut Client<AnyTransport>,
    address: u32,
    buf: &mut [u8],
    pb: &ProgressBar,
) -> CmdResult {
    let mut offset = 0usize;
    for chunk in buf.chunks_mut(CHUNK_SIZE) {
        client.read(address + offset as u32, chunk)?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }
    Ok(())
}

/// First differing offset and the number of differing bytes
pub fn compare(actual: &[u8], expected: &[u8]) -> Option<(usize, usize)> {
    let mut first = None;
    let mut count = 0usize;
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if a != e {
            first.get_or_insert(i);
            count += 1;
        }
    }
    first.map(|i| (i, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uartboot_core::flash::Geometry;

    #[test]
    fn test_compare() {
        assert_eq!(compare(&[1, 2, 3], &[1, 2, 3]), None);
        assert_eq!(compare(&[1, 0, 3, 0], &[1, 2, 3, 4]), Some((1, 2)));
    }

    #[test]
    fn test_check_range() {
        let info = InfoRecord::new((0xEF, 0x16), [0xEF, 0x40, 0x17], &Geometry::W25Q64);
        assert!(check_range(&info, 0, 8 * 1024 * 1024).is_ok());
        assert!(check_range(&info, 1, 8 * 1024 * 1024).is_err());
        assert!(check_range(&info, u32::MAX, 1).is_err());
    }
}
