//! hvrescue - AVR high-voltage parallel fuse rescue
//!
//! Recovers AVR microcontrollers whose fuses disabled the clock source,
//! the reset pin or serial programming, by driving the chip's high-voltage
//! parallel programming interface from GPIO lines.
//!
//! # Architecture
//!
//! The protocol engine lives in `hvrescue-core` and only needs a
//! `ParallelPins` implementation:
//! - **dummy** - a simulated target, for trying the tool without hardware
//! - **linux_gpio** - 18 lines of a Linux GPIO chip wired to the target socket

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Console { programmer } => {
            programmers::with_programmer(&programmer, commands::run_console)
        }
        Commands::Verify { programmer } => {
            programmers::with_programmer(&programmer, commands::run_verify)
        }
        Commands::Read {
            programmer,
            location,
        } => programmers::with_programmer(&programmer, |pins| {
            commands::run_read(pins, location.into())
        }),
        Commands::WriteFuse {
            programmer,
            location,
            value,
        } => programmers::with_programmer(&programmer, |pins| {
            commands::run_write_fuse(pins, location.into(), value)
        }),
        Commands::WriteLock {
            programmer,
            value,
            force,
        } => programmers::with_programmer(&programmer, |pins| {
            commands::run_write_lock(pins, value, force)
        }),
        Commands::Defaults {
            programmer,
            bootloader,
        } => programmers::with_programmer(&programmer, |pins| {
            commands::run_defaults(pins, bootloader)
        }),
        Commands::Erase { programmer } => {
            programmers::with_programmer(&programmer, commands::run_erase)
        }
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
