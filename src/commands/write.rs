//! Write command implementation

use std::path::Path;

use super::erase::erase_sectors;
use super::verify::verify_range;
use super::{check_range, connect, progress_bar, CmdResult, CHUNK_SIZE};

/// Run the write command
///
/// Erases every sector the image touches, then programs it one payload
/// at a time. Bytes outside the image but inside its first and last sector
/// are erased too.
pub fn run_write(
    port: &str,
    input: &Path,
    address: u32,
    do_verify: bool,
    no_erase: bool,
) -> CmdResult {
    let (mut client, info) = connect(port)?;

    let data = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);
    if data.is_empty() {
        return Err("Input file is empty".into());
    }
    check_range(&info, address, data.len())?;

    if !no_erase {
        let sector_size = u32::from(info.sector_size.get());
        if sector_size != 0 && address % sector_size != 0 {
            log::warn!(
                "Start address 0x{:08X} is not sector aligned; the head of its sector is erased too",
                address
            );
        }
        erase_sectors(&mut client, address, data.len() as u32, sector_size)?;
    }

    let pb = progress_bar(data.len() as u64, "Writing");
    let mut offset = 0usize;
    for chunk in data.chunks(CHUNK_SIZE) {
        let at = address + offset as u32;
        if let Err(e) = client.write(at, chunk) {
            pb.abandon_with_message("Write failed!");
            return Err(format!("Write of {} bytes at 0x{:08X} failed: {}", chunk.len(), at, e).into());
        }
        offset += chunk.len();
        pb.set_position(offset as u64);
    }
    pb.finish_with_message("Write complete");

    if do_verify {
        let pb = progress_bar(data.len() as u64, "Verifying");
        verify_range(&mut client, address, &data, &pb)?;
    }

    println!("Write complete!");

    Ok(())
}
