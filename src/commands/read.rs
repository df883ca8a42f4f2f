//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{check_range, connect, progress_bar, read_range, CmdResult};

/// Run the read command
pub fn run_read(port: &str, output: &Path, address: u32, length: Option<u32>) -> CmdResult {
    let (mut client, info) = connect(port)?;

    let capacity = info.capacity.get();
    let length = match length {
        Some(len) => len,
        None => capacity.saturating_sub(address),
    };
    if length == 0 {
        return Err("Nothing to read".into());
    }
    check_range(&info, address, length as usize)?;

    let mut data = vec![0u8; length as usize];
    let pb = progress_bar(length as u64, "Reading");
    read_range(&mut client, address, &mut data, &pb)?;
    pb.finish_with_message("Read complete");

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}
