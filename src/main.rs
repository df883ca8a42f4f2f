//! uartboot - Host tool for the UART SPI-flash bootloader
//!
//! Uploads images to an external SPI NOR flash through a microcontroller
//! running the bootloader, reads them back, and erases sectors or the whole
//! chip.
//!
//! # Architecture
//!
//! - **Host commands** (`info`, `write`, `read`, `verify`, `erase`) speak the
//!   framed serial protocol through `uartboot_serial::Client`, over a serial
//!   port or TCP.
//! - **`serve`** is the device side: it runs the `uartboot_core` engine and
//!   flash driver against the `uartboot_dummy` in-memory chip, so the whole
//!   stack can be exercised without hardware.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::serve::ServeOptions;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_filter()),
    )
    .init();

    match cli.command {
        Commands::Info { port } => commands::info::run_info(&port),
        Commands::Write {
            port,
            input,
            address,
            verify,
            no_erase,
        } => commands::write::run_write(&port, &input, address, verify, no_erase),
        Commands::Read {
            port,
            output,
            address,
            length,
        } => commands::read::run_read(&port, &output, address, length),
        Commands::Verify {
            port,
            input,
            address,
        } => commands::verify::run_verify(&port, &input, address),
        Commands::Erase {
            port,
            address,
            length,
            all,
            erase_timeout,
        } => commands::erase::run_erase(
            &port,
            address,
            length,
            all,
            Duration::from_secs(erase_timeout),
        ),
        Commands::Serve {
            port,
            chip,
            image,
            save,
            busy_polls,
            datasheet_timeouts,
            chip_erase_timeout,
        } => commands::serve::run_serve(&ServeOptions {
            port,
            chip,
            image,
            save,
            busy_polls,
            datasheet_timeouts,
            chip_erase_timeout,
        }),
    }
}
