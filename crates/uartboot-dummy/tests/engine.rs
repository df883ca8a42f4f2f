//! Bootloader engine end to end against the dummy chip

use uartboot_core::boot::{
    crc16, Bootloader, Command, Cycle, InfoRecord, Request, ACK, IO_CHUNK_SIZE, MAX_PAYLOAD_SIZE,
    NACK,
};
use uartboot_core::error::Error;
use uartboot_core::flash::{FlashDriver, Geometry};
use uartboot_core::spi::opcodes;
use uartboot_dummy::{DummyConfig, DummyFlash, ScriptedLink, SimClock};

type Session = Bootloader<ScriptedLink, FlashDriver<DummyFlash, SimClock>>;

fn session(config: DummyConfig, link: ScriptedLink) -> Session {
    let geometry = config.geometry;
    let flash = FlashDriver::new(DummyFlash::new(config), SimClock::stepping(1), geometry);
    Bootloader::new(link, flash)
}

fn chip(boot: &Session) -> &DummyFlash {
    boot.flash().master()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 + 1) as u8).collect()
}

fn nacked(command: Option<Command>, reason: Error) -> Cycle {
    Cycle::Nacked { command, reason }
}

#[test]
fn test_get_info_w25q64() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::GetInfo);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::GetInfo));

    let out = boot.transport_mut().take_output();
    assert_eq!(out.len(), 14);
    assert_eq!(out[0], ACK);
    let info = InfoRecord::parse(&out[1..]).unwrap();
    assert_eq!(info.manufacturer_id, 0xEF);
    assert_eq!(info.device_id, 0x16);
    assert_eq!(info.jedec_id, [0xEF, 0x40, 0x17]);
    assert_eq!(info.capacity.get(), 8 * 1024 * 1024);
    assert_eq!(info.page_size.get(), 256);
    assert_eq!(info.sector_size.get(), 4096);
}

#[test]
fn test_get_info_w25q128() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::GetInfo);
    let mut boot = session(DummyConfig::w25q128(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::GetInfo));
    let out = boot.transport_mut().take_output();
    assert_eq!(&out[1..6], &[0xEF, 0x17, 0xEF, 0x40, 0x18]);
    assert_eq!(&out[6..10], &(16u32 * 1024 * 1024).to_le_bytes());
}

#[test]
fn test_write_then_read() {
    let data = pattern(300);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 0x1000,
        data: &data,
    })
    .push_request(&Request::Read {
        address: 0x1000,
        length: 300,
    });
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::Write));
    assert_eq!(boot.transport_mut().take_output(), [ACK]);

    assert_eq!(boot.process(), Cycle::Acked(Command::Read));
    let out = boot.transport_mut().take_output();
    assert_eq!(out.len(), 1 + 300 + 2);
    assert_eq!(out[0], ACK);
    assert_eq!(&out[1..301], &data[..]);
    assert_eq!(&out[301..], &crc16(&data).to_le_bytes());

    assert_eq!(boot.stats().bytes_written, 300);
    assert_eq!(boot.stats().bytes_read, 300);
}

#[test]
fn test_ten_byte_write_and_read_back() {
    let data: Vec<u8> = (0x00..=0x09).collect();
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 0x0000_1000,
        data: &data,
    })
    .push_request(&Request::Read {
        address: 0x0000_1000,
        length: 10,
    });
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::Write));
    assert_eq!(boot.process(), Cycle::Acked(Command::Read));

    let mut expected = vec![ACK, ACK];
    expected.extend_from_slice(&data);
    expected.extend_from_slice(&crc16(&data).to_le_bytes());
    assert_eq!(boot.transport_mut().take_output(), expected);
    assert_eq!(&chip(&boot).data()[0x1000..0x100A], &data[..]);
}

#[test]
fn test_unaligned_write_spanning_pages() {
    let data = pattern(10);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 256 - 3,
        data: &data,
    });
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::Write));
    assert_eq!(&chip(&boot).data()[253..263], &data[..]);
    assert_eq!(chip(&boot).count(opcodes::PP), 2);
}

#[test]
fn test_checksum_mismatch_leaves_flash_untouched() {
    let data = pattern(64);
    let req = Request::Write {
        address: 0,
        data: &data,
    };
    let mut bad_crc = req.trailer().unwrap();
    bad_crc[0] ^= 0x01;

    let mut link = ScriptedLink::new();
    link.push(req.header().as_bytes()).push(&data).push(&bad_crc);
    let mut boot = session(DummyConfig::w25q64(), link);

    let expected = crc16(&data) ^ 0x0001;
    assert_eq!(
        boot.process(),
        nacked(
            Some(Command::Write),
            Error::ChecksumMismatch {
                expected,
                actual: crc16(&data)
            }
        )
    );
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
    assert!(chip(&boot).data()[..64].iter().all(|&b| b == 0xFF));
    assert_eq!(chip(&boot).history().count(), 0);
    assert_eq!(boot.stats().bytes_written, 0);
}

#[test]
fn test_length_bounds() {
    let mut link = ScriptedLink::new();
    // WRITE with LEN = 0
    link.push(&[0xAA, 0x55, 0x01, 0, 0, 0, 0]);
    // READ with LEN = 0
    link.push(&[0xAA, 0x55, 0x02, 0, 0, 0, 0]);
    // READ with LEN = max + 1
    link.push(&[0xAA, 0x55, 0x02]).push(&(MAX_PAYLOAD_SIZE as u32 + 1).to_le_bytes());
    // WRITE with LEN = max + 1
    link.push(&[0xAA, 0x55, 0x01]).push(&(MAX_PAYLOAD_SIZE as u32 + 1).to_le_bytes());
    let mut boot = session(DummyConfig::w25q64(), link);

    let write_rejected = nacked(Some(Command::Write), Error::InvalidLength);
    let read_rejected = nacked(Some(Command::Read), Error::InvalidLength);
    assert_eq!(boot.process(), write_rejected);
    assert_eq!(boot.process(), read_rejected);
    assert_eq!(boot.process(), read_rejected);
    assert_eq!(boot.process(), write_rejected);
    assert_eq!(boot.transport_mut().take_output(), [NACK, NACK, NACK, NACK]);
    assert_eq!(chip(&boot).history().count(), 0);
}

#[test]
fn test_max_payload_accepted() {
    let data = pattern(MAX_PAYLOAD_SIZE);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 0x2_0000,
        data: &data,
    });
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Acked(Command::Write));
    assert_eq!(&chip(&boot).data()[0x2_0000..0x2_1000], &data[..]);

    // Serial reads are capped at the I/O chunk size
    let sizes = boot.transport_mut().read_sizes().to_vec();
    assert!(sizes.iter().all(|&n| n <= IO_CHUNK_SIZE));
    assert_eq!(sizes.iter().filter(|&&n| n == IO_CHUNK_SIZE).count(), 16);
}

#[test]
fn test_out_of_range_requests_never_reach_flash() {
    let end = Geometry::W25Q64.total_size;
    let data = pattern(16);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: end - 8,
        data: &data,
    })
    .push_request(&Request::Read {
        address: end - 8,
        length: 16,
    })
    .push_request(&Request::EraseSector { address: end });
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(
        boot.process(),
        nacked(Some(Command::Write), Error::AddressOutOfBounds)
    );
    assert_eq!(
        boot.process(),
        nacked(Some(Command::Read), Error::AddressOutOfBounds)
    );
    assert_eq!(
        boot.process(),
        nacked(Some(Command::EraseSector), Error::AddressOutOfBounds)
    );
    assert_eq!(chip(&boot).history().count(), 0);
}

#[test]
fn test_unknown_and_reserved_commands() {
    let mut link = ScriptedLink::new();
    link.push(&[0xAA, 0x55, 0x42]).push(&[0xAA, 0x55, 0x06]);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), nacked(None, Error::UnknownCommand(0x42)));
    assert_eq!(
        boot.process(),
        nacked(Some(Command::Verify), Error::UnsupportedCommand(0x06))
    );
    assert_eq!(boot.transport_mut().take_output(), [NACK, NACK]);
}

#[test]
fn test_noise_before_marker_resyncs() {
    let mut link = ScriptedLink::new();
    link.push(&[0x00, 0x13, 0x55, 0xAA]).push_request(&Request::GetInfo);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), Cycle::Resync);
    assert_eq!(boot.process(), Cycle::Resync);
    assert!(boot.transport_mut().output().is_empty());
    assert_eq!(boot.process(), Cycle::Acked(Command::GetInfo));
}

#[test]
fn test_command_byte_timeout() {
    let mut link = ScriptedLink::new();
    link.push(&[0xAA, 0x55]);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), nacked(None, Error::Timeout));
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
}

#[test]
fn test_truncated_payload_times_out() {
    let data = pattern(512);
    let req = Request::Write {
        address: 0,
        data: &data,
    };
    let mut link = ScriptedLink::new();
    link.push(req.header().as_bytes()).push(&data[..300]);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.process(), nacked(Some(Command::Write), Error::Timeout));
    assert_eq!(chip(&boot).history().count(), 0);
}

#[test]
fn test_erase_sector_command() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::EraseSector { address: 0x1234 });
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().data_mut()[..0x3000].fill(0x00);

    assert_eq!(boot.process(), Cycle::Acked(Command::EraseSector));
    let data = chip(&boot).data();
    assert!(data[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    assert_eq!(data[0x0FFF], 0x00);
    assert_eq!(data[0x2000], 0x00);
}

#[test]
fn test_erase_sector_failure_is_nacked() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::EraseSector { address: 0x2000 });
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().set_stuck_busy(true);

    assert_eq!(
        boot.process(),
        nacked(Some(Command::EraseSector), Error::Timeout)
    );
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
    assert_eq!(boot.stats().nacked, 1);
}

#[test]
fn test_read_failure_is_nacked() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Read {
        address: 0,
        length: 64,
    });
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().fail_opcode_after(opcodes::READ, 0);

    assert_eq!(
        boot.process(),
        nacked(Some(Command::Read), Error::TransferFailed)
    );
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
    assert_eq!(boot.stats().bytes_read, 0);
}

#[test]
fn test_erase_chip_timeout_is_nacked() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::EraseChip);
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().set_stuck_busy(true);

    assert_eq!(boot.process(), nacked(Some(Command::EraseChip), Error::Timeout));
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
}

#[test]
fn test_erase_chip_command() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::EraseChip);
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().data_mut().fill(0x5A);

    assert_eq!(boot.process(), Cycle::Acked(Command::EraseChip));
    assert!(chip(&boot).data().iter().all(|&b| b == 0xFF));
}

#[test]
fn test_failed_write_keeps_committed_pages() {
    let data = pattern(1024);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 0,
        data: &data,
    });
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().fail_opcode_after(opcodes::PP, 2);

    assert_eq!(
        boot.process(),
        nacked(Some(Command::Write), Error::TransferFailed)
    );
    assert_eq!(&chip(&boot).data()[..512], &data[..512]);
    assert!(chip(&boot).data()[512..1024].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_get_info_failure_is_nacked() {
    let mut link = ScriptedLink::new();
    link.push_request(&Request::GetInfo);
    let mut boot = session(DummyConfig::w25q64(), link);
    boot.flash_mut().master_mut().fail_opcode_after(opcodes::RDID, 0);

    assert_eq!(
        boot.process(),
        nacked(Some(Command::GetInfo), Error::TransferFailed)
    );
    assert_eq!(boot.transport_mut().take_output(), [NACK]);
}

#[test]
fn test_run_stops_when_link_closes() {
    let data = pattern(32);
    let mut link = ScriptedLink::new();
    link.push_request(&Request::Write {
        address: 0x100,
        data: &data,
    })
    .push(&[0x00, 0x00])
    .push_request(&Request::Read {
        address: 0x100,
        length: 32,
    })
    .push(&[0xAA, 0x55, 0x09]);
    let mut boot = session(DummyConfig::w25q64(), link);

    assert_eq!(boot.run().unwrap_err(), Error::Disconnected);
    assert_eq!(boot.stats().acked, 2);
    assert_eq!(boot.stats().nacked, 1);
    assert_eq!(boot.stats().bytes_written, 32);
    assert_eq!(boot.stats().bytes_read, 32);

    let (link, _) = boot.into_inner();
    assert_eq!(link.remaining(), 0);
}
