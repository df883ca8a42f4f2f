//! Erase command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use uartboot_serial::{AnyTransport, Client};

use super::{check_range, connect, CmdResult};

/// Run the erase command
pub fn run_erase(
    port: &str,
    address: Option<u32>,
    length: Option<u32>,
    all: bool,
    erase_timeout: Duration,
) -> CmdResult {
    let (mut client, info) = connect(port)?;

    match (address, length) {
        (Some(start), Some(len)) if !all => {
            if len == 0 {
                return Err("Erase length must be non-zero".into());
            }
            check_range(&info, start, len as usize)?;
            let sector_size = u32::from(info.sector_size.get());
            erase_sectors(&mut client, start, len, sector_size)?;
            println!("Erased sectors covering 0x{:08X}..0x{:08X}", start, start as u64 + len as u64);
        }
        (None, None) if all => {
            chip_erase_with_progress(&mut client, info.capacity.get(), erase_timeout)?;
            println!("Chip erase complete");
        }
        _ => {
            return Err(
                "Use --address with --length for a partial erase, or --all for the whole chip"
                    .into(),
            );
        }
    }

    Ok(())
}

/// Start addresses of every sector touching `address..address + len`
pub fn sectors_covering(address: u32, len: u32, sector_size: u32) -> impl Iterator<Item = u32> {
    let first = address / sector_size;
    let last = if len == 0 {
        first
    } else {
        ((address as u64 + len as u64 - 1) / sector_size as u64) as u32 + 1
    };
    (first..last).map(move |s| s * sector_size)
}

/// Erase every sector touching a range, with a progress bar
pub fn erase_sectors(
    client: &mut Client<AnyTransport>,
    address: u32,
    len: u32,
    sector_size: u32,
) -> CmdResult {
    if sector_size == 0 {
        return Err("Device reported a zero sector size".into());
    }
    let sectors: Vec<u32> = sectors_covering(address, len, sector_size).collect();

    let pb = ProgressBar::new(sectors.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sectors ({eta}) Erasing")?
            .progress_chars("#>-"),
    );

    for (i, sector) in sectors.iter().enumerate() {
        log::debug!("Erasing sector at 0x{:08X}", sector);
        if let Err(e) = client.erase_sector(*sector) {
            pb.abandon_with_message("Erase failed!");
            return Err(format!("Erase of sector 0x{:08X} failed: {}", sector, e).into());
        }
        pb.set_position(i as u64 + 1);
    }

    pb.finish_with_message("Erase complete");
    Ok(())
}

/// Erase the entire chip with a progress spinner
pub fn chip_erase_with_progress(
    client: &mut Client<AnyTransport>,
    total_size: u32,
    timeout: Duration,
) -> CmdResult {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Erasing {} bytes (this may take a while)...",
        total_size
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let previous = client.timeout();
    client.set_timeout(timeout);
    let result = client.erase_chip();
    client.set_timeout(previous);

    if let Err(e) = result {
        pb.abandon_with_message("Chip erase failed!");
        return Err(e.into());
    }

    pb.finish_with_message(format!("Erased {} bytes", total_size));
    Ok(())
}
