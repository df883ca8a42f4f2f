//! Info command implementation

use super::{connect, CmdResult};

/// Run the info command
pub fn run_info(port: &str) -> CmdResult {
    let (_client, info) = connect(port)?;
    let capacity = info.capacity.get();

    println!("Flash Chip Information");
    println!("======================");
    println!();
    println!("Manufacturer ID: 0x{:02X}", info.manufacturer_id);
    println!("Device ID:       0x{:02X}", info.device_id);
    println!(
        "JEDEC ID:        {:02X} {:02X} {:02X}",
        info.jedec_id[0], info.jedec_id[1], info.jedec_id[2]
    );
    println!(
        "Size:            {} bytes ({} KiB / {} MiB)",
        capacity,
        capacity / 1024,
        capacity / (1024 * 1024)
    );
    println!("Page size:       {} bytes", info.page_size.get());
    println!("Sector size:     {} bytes", info.sector_size.get());

    Ok(())
}
