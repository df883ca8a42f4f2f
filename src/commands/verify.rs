//! Verify command implementation

use indicatif::ProgressBar;
use std::path::Path;
use uartboot_serial::{AnyTransport, Client};

use super::{check_range, compare, connect, progress_bar, CmdResult, CHUNK_SIZE};

/// Run the verify command
pub fn run_verify(port: &str, input: &Path, address: u32) -> CmdResult {
    let (mut client, info) = connect(port)?;

    let expected = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", expected.len(), input);
    if expected.is_empty() {
        return Err("Input file is empty".into());
    }
    check_range(&info, address, expected.len())?;

    let pb = progress_bar(expected.len() as u64, "Verifying");
    verify_range(&mut client, address, &expected, &pb)?;

    println!("Verification passed!");
    Ok(())
}

/// Read back `expected.len()` bytes at `address` and compare
///
/// Keeps reading after a mismatch so the report covers the whole range.
pub fn verify_range(
    client: &mut Client<AnyTransport>,
    address: u32,
    expected: &[u8],
    pb: &ProgressBar,
) -> CmdResult {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut first_mismatch: Option<(usize, u8)> = None;
    let mut mismatch_count = 0usize;

    let mut offset = 0usize;
    for want in expected.chunks(CHUNK_SIZE) {
        let got = &mut buf[..want.len()];
        client.read(address + offset as u32, got)?;

        if let Some((i, n)) = compare(got, want) {
            first_mismatch.get_or_insert((offset + i, got[i]));
            mismatch_count += n;
        }

        offset += want.len();
        pb.set_position(offset as u64);
    }

    if let Some((at, actual)) = first_mismatch {
        pb.abandon_with_message("Verification failed!");
        return Err(format!(
            "Verification failed: {} byte(s) differ. First mismatch at 0x{:08X}: expected 0x{:02X}, got 0x{:02X}",
            mismatch_count,
            address as usize + at,
            expected[at],
            actual
        )
        .into());
    }

    pb.finish_with_message("Verification passed");
    Ok(())
}
