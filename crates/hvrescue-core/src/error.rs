//! Error types for hvrescue-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::device::FuseLocation;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The signature read from the target matched no registry entry, or no
    /// identification has been run yet
    UnknownDevice,
    /// RDY/BSY never signalled ready within the write deadline
    WriteTimeout,
    /// A committed write read back a different value after all retries
    VerifyMismatch {
        /// Register that was written
        location: FuseLocation,
        /// Value that was requested
        expected: u8,
        /// Value that was read back
        found: u8,
    },
    /// Console input outside the accepted alphabet
    InvalidInput,
}

impl Error {
    /// Returns true if the target never reported ready
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WriteTimeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice => write!(f, "unknown device"),
            Self::WriteTimeout => write!(f, "timed out waiting for RDY/BSY"),
            Self::VerifyMismatch {
                location,
                expected,
                found,
            } => write!(
                f,
                "verify failed for {}: wrote 0x{:02X}, read back 0x{:02X}",
                location, expected, found
            ),
            Self::InvalidInput => write!(f, "invalid input"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
