//! Serve command: the device side, emulated
//!
//! Runs the real bootloader engine and flash driver against the in-memory
//! chip, over a serial port or TCP. TCP clients are served one at a time;
//! the chip keeps its contents between sessions.

use std::net::TcpListener;
use std::path::{Path, PathBuf};

use uartboot_core::boot::{Bootloader, Transport};
use uartboot_core::flash::{FlashDriver, PollTimeouts};
use uartboot_core::programmer::StdClock;
use uartboot_dummy::{DummyConfig, DummyFlash};
use uartboot_serial::{Connection, SerialTransport, TcpTransport};

use super::CmdResult;

/// Emulator settings gathered from the command line
pub struct ServeOptions {
    pub port: String,
    pub chip: String,
    pub image: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub busy_polls: u32,
    pub datasheet_timeouts: bool,
    pub chip_erase_timeout: Option<u32>,
}

impl ServeOptions {
    fn timeouts(&self) -> PollTimeouts {
        let mut timeouts = if self.datasheet_timeouts {
            PollTimeouts::datasheet()
        } else {
            PollTimeouts::default()
        };
        if let Some(ms) = self.chip_erase_timeout {
            timeouts.chip_erase_ms = ms;
        }
        timeouts
    }
}

/// Run the serve command
pub fn run_serve(opts: &ServeOptions) -> CmdResult {
    let config = DummyConfig::by_name(&opts.chip)
        .ok_or_else(|| format!("Unknown chip '{}' (available: w25q64, w25q128)", opts.chip))?
        .with_busy_polls(opts.busy_polls);

    let mut chip = match &opts.image {
        Some(path) => {
            let image = std::fs::read(path)?;
            if image.len() > config.geometry.total_size as usize {
                return Err(format!(
                    "Image ({} bytes) is larger than {} ({} bytes)",
                    image.len(),
                    config.name,
                    config.geometry.total_size
                )
                .into());
            }
            log::info!("Loaded {} bytes from {:?}", image.len(), path);
            DummyFlash::with_data(config, &image)
        }
        None => DummyFlash::new(config),
    };
    log::info!(
        "Emulating {} ({} bytes)",
        chip.config().name,
        chip.config().geometry.total_size
    );

    match Connection::parse(&opts.port)? {
        Connection::Serial { device, baud } => {
            let link = SerialTransport::open(&device, baud)?;
            chip = session(link, chip, opts)?;
            save(&chip, opts.save.as_deref())
        }
        Connection::Listen { host, port } => {
            let listener = TcpListener::bind((host.as_str(), port))?;
            log::info!("Listening on {}", listener.local_addr()?);
            loop {
                let link = TcpTransport::accept(&listener)?;
                chip = session(link, chip, opts)?;
                save(&chip, opts.save.as_deref())?;
            }
        }
        Connection::Tcp { .. } => {
            Err("serve needs dev=<path>[:<baud>] or listen=<addr>:<port>".into())
        }
    }
}

/// Serve one link until it closes, then hand the chip back
fn session<T: Transport>(link: T, chip: DummyFlash, opts: &ServeOptions) -> CmdResult<DummyFlash> {
    let geometry = chip.config().geometry;
    let mut flash = FlashDriver::new(chip, StdClock::new(), geometry).with_timeouts(opts.timeouts());
    flash.init()?;

    let mut boot = Bootloader::new(link, flash);
    if let Err(e) = boot.run() {
        log::info!("Session ended: {}", e);
    }
    let stats = *boot.stats();
    log::info!(
        "{} requests acknowledged, {} refused",
        stats.acked,
        stats.nacked
    );

    let (_link, flash) = boot.into_inner();
    let (chip, _clock) = flash.release();
    Ok(chip)
}

fn save(chip: &DummyFlash, path: Option<&Path>) -> CmdResult {
    if let Some(path) = path {
        std::fs::write(path, chip.data())?;
        log::info!("Saved flash contents to {:?}", path);
    }
    Ok(())
}
