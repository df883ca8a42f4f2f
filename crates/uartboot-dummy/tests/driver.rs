//! Flash driver against the dummy chip

use uartboot_core::error::Error;
use uartboot_core::flash::{FlashDriver, Geometry, PollTimeouts};
use uartboot_core::spi::opcodes;
use uartboot_dummy::{DummyConfig, DummyFlash, Op, SimClock};

fn driver(config: DummyConfig, clock: &SimClock) -> FlashDriver<DummyFlash, &SimClock> {
    let geometry = config.geometry;
    FlashDriver::new(DummyFlash::new(config), clock, geometry)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

fn program_ops(flash: &DummyFlash) -> Vec<Op> {
    flash
        .history()
        .filter(|op| op.opcode == opcodes::PP)
        .copied()
        .collect()
}

#[test]
fn test_identify_presets() {
    let clock = SimClock::new();

    let mut flash = driver(DummyConfig::w25q64(), &clock);
    assert_eq!(flash.identify().unwrap(), (0xEF, 0x16));
    assert_eq!(flash.identify_jedec().unwrap(), [0xEF, 0x40, 0x17]);

    let mut flash = driver(DummyConfig::w25q128(), &clock);
    assert_eq!(flash.identify().unwrap(), (0xEF, 0x17));
    assert_eq!(flash.identify_jedec().unwrap(), [0xEF, 0x40, 0x18]);
    assert_eq!(flash.geometry(), &Geometry::W25Q128);
}

#[test]
fn test_init_wakes_chip() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.power_down().unwrap();
    assert!(flash.master().is_powered_down());

    flash.init().unwrap();
    assert!(!flash.master().is_powered_down());
    assert_eq!(flash.master().delayed_us(), 1000);
    assert_eq!(flash.identify().unwrap(), (0xEF, 0x16));
}

#[test]
fn test_write_read_roundtrip_multi_page() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    let data = pattern(1000);

    flash.write(100, &data).unwrap();

    let mut back = vec![0u8; 1000];
    flash.read(100, &mut back).unwrap();
    assert_eq!(back, data);
    assert_eq!(flash.master().data()[99], 0xFF);
    assert_eq!(flash.master().data()[1100], 0xFF);
}

#[test]
fn test_write_across_page_boundary() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    let data = pattern(10);

    flash.write(256 - 3, &data).unwrap();

    let ops = program_ops(flash.master());
    assert_eq!(ops.len(), 2);
    assert_eq!((ops[0].address, ops[0].write_len), (Some(253), 3));
    assert_eq!((ops[1].address, ops[1].write_len), (Some(256), 7));

    let mut back = [0u8; 10];
    flash.read(253, &mut back).unwrap();
    assert_eq!(&back[..], &data[..]);
}

#[test]
fn test_page_programs_never_cross_boundaries() {
    let clock = SimClock::new();
    for &(addr, len) in &[(0u32, 1usize), (0, 256), (1, 256), (255, 2), (300, 4096), (4095, 513)] {
        let mut flash = driver(DummyConfig::w25q64(), &clock);
        flash.write(addr, &pattern(len)).unwrap();

        let ops = program_ops(flash.master());
        let expected = (addr as usize % 256 + len).div_ceil(256);
        assert_eq!(ops.len(), expected, "({}, {})", addr, len);

        let mut next = addr;
        for op in &ops {
            let start = op.address.unwrap();
            assert_eq!(start, next);
            assert_eq!(start / 256, (start + op.write_len as u32 - 1) / 256);
            next += op.write_len as u32;
        }
        assert_eq!(next, addr + len as u32);
    }
}

#[test]
fn test_each_page_gets_write_enable() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.write(0, &pattern(768)).unwrap();

    let sequence: Vec<u8> = flash.master().history().map(|op| op.opcode).collect();
    assert_eq!(
        sequence,
        [
            opcodes::WREN, opcodes::PP, opcodes::RDSR,
            opcodes::WREN, opcodes::PP, opcodes::RDSR,
            opcodes::WREN, opcodes::PP, opcodes::RDSR,
        ]
    );
}

#[test]
fn test_oversized_page_rejected_without_io() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    assert_eq!(flash.write_page(0, &pattern(257)), Err(Error::InvalidLength));
    assert_eq!(flash.master().history().count(), 0);
}

#[test]
fn test_out_of_range_rejected_without_io() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    let end = Geometry::W25Q64.total_size;

    assert_eq!(flash.write(end - 4, &pattern(8)), Err(Error::AddressOutOfBounds));
    let mut buf = [0u8; 8];
    assert_eq!(flash.read(end - 4, &mut buf), Err(Error::AddressOutOfBounds));
    assert_eq!(flash.erase_sector(end), Err(Error::AddressOutOfBounds));
    assert_eq!(flash.master().history().count(), 0);

    // The last byte is still reachable
    flash.write(end - 1, &[0x00]).unwrap();
    assert_eq!(flash.master().data()[end as usize - 1], 0x00);
}

#[test]
fn test_busy_chip_is_polled_to_completion() {
    let clock = SimClock::stepping(1);
    let mut flash = driver(DummyConfig::w25q64().with_busy_polls(3), &clock);

    flash.erase_sector(0).unwrap();
    assert_eq!(flash.master().count(opcodes::RDSR), 4);
    assert_eq!(flash.master().delayed_us(), 3 * 100);
}

#[test]
fn test_stuck_busy_times_out() {
    let clock = SimClock::stepping(100);
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.master_mut().set_stuck_busy(true);

    let start = clock.peek();
    assert_eq!(flash.write_page(0, &[0u8; 16]), Err(Error::Timeout));
    assert!(clock.peek() - start > 5000);

    let start = clock.peek();
    assert_eq!(flash.erase_sector(0), Err(Error::Timeout));
    assert!(clock.peek() - start > 5000);

    // Uniform ceiling: chip erase gives up after the same 5 s
    let start = clock.peek();
    assert_eq!(flash.erase_chip(), Err(Error::Timeout));
    assert!(clock.peek() - start < 6000);
}

#[test]
fn test_datasheet_timeouts_extend_chip_erase() {
    let clock = SimClock::stepping(1000);
    let mut flash = driver(DummyConfig::w25q64(), &clock).with_timeouts(PollTimeouts::datasheet());
    flash.master_mut().set_stuck_busy(true);

    let start = clock.peek();
    assert_eq!(flash.erase_chip(), Err(Error::Timeout));
    assert!(clock.peek() - start > 200_000);
}

#[test]
fn test_status_read_failure_is_generic_error() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.master_mut().fail_opcode_after(opcodes::RDSR, 0);

    assert_eq!(flash.erase_sector(0), Err(Error::TransferFailed));
    assert_eq!(flash.wait_ready(5000), Err(Error::TransferFailed));
}

#[test]
fn test_failed_page_keeps_earlier_pages() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.master_mut().fail_opcode_after(opcodes::PP, 1);
    let data = pattern(768);

    assert_eq!(flash.write(0, &data), Err(Error::TransferFailed));

    // First page committed, later ones untouched, no third attempt
    assert_eq!(&flash.master().data()[..256], &data[..256]);
    assert!(flash.master().data()[256..768].iter().all(|&b| b == 0xFF));
    assert_eq!(flash.master().count(opcodes::PP), 2);
}

#[test]
fn test_erase_granularities() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);
    flash.master_mut().data_mut()[..0x20000].fill(0x00);

    flash.erase_sector(0x1234).unwrap();
    assert!(flash.master().data()[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    assert_eq!(flash.master().data()[0x0FFF], 0x00);
    assert_eq!(flash.master().data()[0x2000], 0x00);

    flash.erase_block_64k(0x1_0010).unwrap();
    assert!(flash.master().data()[0x1_0000..0x2_0000].iter().all(|&b| b == 0xFF));
    assert_eq!(flash.master().data()[0x0_FFFF], 0x00);

    flash.erase_chip().unwrap();
    assert!(flash.master().data().iter().all(|&b| b == 0xFF));
}

#[test]
fn test_write_enable_building_blocks() {
    let clock = SimClock::new();
    let mut flash = driver(DummyConfig::w25q64(), &clock);

    flash.write_enable().unwrap();
    assert!(flash.read_status().unwrap().write_enabled());
    flash.write_disable().unwrap();
    assert!(!flash.read_status().unwrap().write_enabled());
    flash.wait_ready(10).unwrap();
}
