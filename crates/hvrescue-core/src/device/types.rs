//! Device type definitions

use core::fmt;

/// A fuse triple in the order it is written: low, high, extended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseSet {
    /// Low fuse byte
    pub low: u8,
    /// High fuse byte
    pub high: u8,
    /// Extended fuse byte
    pub extended: u8,
}

impl FuseSet {
    /// Create a new fuse triple
    pub const fn new(low: u8, high: u8, extended: u8) -> Self {
        Self {
            low,
            high,
            extended,
        }
    }

    /// Value for one of the three fuse locations
    ///
    /// Returns `None` for [`FuseLocation::Lock`], which is not part of a fuse set.
    pub fn get(&self, location: FuseLocation) -> Option<u8> {
        match location {
            FuseLocation::Low => Some(self.low),
            FuseLocation::High => Some(self.high),
            FuseLocation::Extended => Some(self.extended),
            FuseLocation::Lock => None,
        }
    }

    /// Iterate over (location, value) pairs in write order
    pub fn iter(&self) -> impl Iterator<Item = (FuseLocation, u8)> {
        [
            (FuseLocation::Low, self.low),
            (FuseLocation::High, self.high),
            (FuseLocation::Extended, self.extended),
        ]
        .into_iter()
    }
}

impl fmt::Display for FuseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{0x{:02X},0x{:02X},0x{:02X}}}",
            self.low, self.high, self.extended
        )
    }
}

/// One of the four addressable non-volatile configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuseLocation {
    /// Low fuse byte
    Low,
    /// High fuse byte
    High,
    /// Extended fuse byte
    Extended,
    /// Lock bits
    Lock,
}

impl FuseLocation {
    /// The three fuse bytes, in the order they are written
    pub const FUSES: [FuseLocation; 3] = [Self::Low, Self::High, Self::Extended];

    /// Short lowercase name used in console and CLI output
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Extended => "ext",
            Self::Lock => "lock",
        }
    }
}

impl fmt::Display for FuseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of all four configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseSnapshot {
    /// Current fuse bytes
    pub fuses: FuseSet,
    /// Current lock bits
    pub lock: u8,
}

/// Static description of a supported AVR part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Part name
    pub name: &'static str,
    /// 24-bit signature, byte 0 in the most significant position
    pub signature: u32,
    /// EEPROM size in bytes
    pub eeprom_size: u16,
    /// Factory default fuses
    pub default_fuse: FuseSet,
    /// Fuses for running the Arduino bootloader
    pub bootloader_fuse: FuseSet,
}

impl DeviceDescriptor {
    /// Create a new device descriptor
    pub const fn new(
        name: &'static str,
        signature: u32,
        eeprom_size: u16,
        default_fuse: FuseSet,
        bootloader_fuse: FuseSet,
    ) -> Self {
        Self {
            name,
            signature,
            eeprom_size,
            default_fuse,
            bootloader_fuse,
        }
    }

    /// Signature split into the three bytes stored on the chip
    pub const fn signature_bytes(&self) -> [u8; 3] {
        [
            (self.signature >> 16) as u8,
            (self.signature >> 8) as u8,
            self.signature as u8,
        ]
    }

    /// Fuse triple for the requested preset
    pub const fn fuses(&self, bootloader: bool) -> FuseSet {
        if bootloader {
            self.bootloader_fuse
        } else {
            self.default_fuse
        }
    }
}

/// Lock value that leaves both LB1 and LB2 programmed (LB mode 3)
///
/// In this mode fuses and lock bits can no longer be changed by parallel
/// programming; only a chip erase clears it.
pub const fn is_lock_mode_3(lock: u8) -> bool {
    lock & 0x03 == 0
}
