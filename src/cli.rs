//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand, ValueEnum};
use hvrescue_core::device::FuseLocation;

/// Parse a string as a hex (0x prefixed) or decimal byte
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

/// Fuse byte selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FuseArg {
    /// Low fuse byte
    Low,
    /// High fuse byte
    High,
    /// Extended fuse byte
    Ext,
}

impl From<FuseArg> for FuseLocation {
    fn from(arg: FuseArg) -> Self {
        match arg {
            FuseArg::Low => FuseLocation::Low,
            FuseArg::High => FuseLocation::High,
            FuseArg::Ext => FuseLocation::Extended,
        }
    }
}

/// Register readable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocationArg {
    /// Low fuse byte
    Low,
    /// High fuse byte
    High,
    /// Extended fuse byte
    Ext,
    /// Lock bits
    Lock,
}

impl From<LocationArg> for FuseLocation {
    fn from(arg: LocationArg) -> Self {
        match arg {
            LocationArg::Low => FuseLocation::Low,
            LocationArg::High => FuseLocation::High,
            LocationArg::Ext => FuseLocation::Extended,
            LocationArg::Lock => FuseLocation::Lock,
        }
    }
}

#[derive(Parser)]
#[command(name = "hvrescue")]
#[command(author, version, about = "AVR high-voltage parallel fuse rescue", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive fuse rescue console on stdin/stdout
    Console {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Identify the target and show its fuses and lock bits
    Verify {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Read a single fuse byte or the lock bits
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Register to read
        #[arg(short, long, value_enum)]
        location: LocationArg,
    },

    /// Write a single fuse byte
    WriteFuse {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Fuse byte to write
        #[arg(short, long, value_enum)]
        location: FuseArg,

        /// New value (decimal or 0x prefixed hex)
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Write the lock bits
    WriteLock {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// New value (decimal or 0x prefixed hex)
        #[arg(value_parser = parse_hex_u8)]
        value: u8,

        /// Allow lock mode 3, which locks the fuses until the next chip erase
        #[arg(long)]
        force: bool,
    },

    /// Restore the factory default fuses of the identified device
    Defaults {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Write the Arduino bootloader fuses instead
        #[arg(long)]
        bootloader: bool,
    },

    /// Erase flash, EEPROM and lock bits
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// List supported devices
    ListDevices,

    /// List supported programmers
    ListProgrammers,
}
