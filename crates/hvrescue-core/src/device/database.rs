//! Compiled-in device registry

use super::types::{DeviceDescriptor, FuseSet};

/// All parts known to the rescue engine
///
/// Signatures must stay pairwise distinct; lookups return the first match.
pub static DEVICES: &[DeviceDescriptor] = &[
    DeviceDescriptor::new(
        "ATmega8",
        0x1E9307,
        256,
        FuseSet::new(0xE1, 0xD9, 0xFF),
        FuseSet::new(0xE2, 0xDD, 0x77),
    ),
    DeviceDescriptor::new(
        "ATmega48A",
        0x1E9205,
        256,
        FuseSet::new(0x62, 0xDF, 0xFF),
        FuseSet::new(0xE2, 0xDD, 0x77),
    ),
    DeviceDescriptor::new(
        "ATmega48PA",
        0x1E920A,
        256,
        FuseSet::new(0x62, 0xDF, 0xFF),
        FuseSet::new(0xE2, 0xDD, 0x77),
    ),
    DeviceDescriptor::new(
        "ATmega88A",
        0x1E930A,
        512,
        FuseSet::new(0x62, 0xDF, 0xF9),
        FuseSet::new(0xE2, 0xDD, 0x77),
    ),
    DeviceDescriptor::new(
        "ATmega88PA",
        0x1E930F,
        512,
        FuseSet::new(0x62, 0xDF, 0xF9),
        FuseSet::new(0xE2, 0xDD, 0x77),
    ),
    DeviceDescriptor::new(
        "ATmega168A",
        0x1E9406,
        512,
        FuseSet::new(0x62, 0xDF, 0xF9),
        FuseSet::new(0xFF, 0xDD, 0x00),
    ),
    DeviceDescriptor::new(
        "ATmega168PA",
        0x1E940B,
        512,
        FuseSet::new(0x62, 0xDF, 0xF9),
        FuseSet::new(0xFF, 0xDD, 0x00),
    ),
    DeviceDescriptor::new(
        "ATmega328",
        0x1E9514,
        1024,
        FuseSet::new(0x62, 0xD9, 0xFF),
        FuseSet::new(0xFF, 0xDA, 0x05),
    ),
    DeviceDescriptor::new(
        "ATmega328P",
        0x1E950F,
        1024,
        FuseSet::new(0x62, 0xD9, 0xFF),
        FuseSet::new(0xFF, 0xDE, 0x05),
    ),
];

/// Read-only view over a device table
#[derive(Debug, Clone, Copy)]
pub struct DeviceRegistry {
    devices: &'static [DeviceDescriptor],
}

impl DeviceRegistry {
    /// Registry over a custom table
    pub const fn new(devices: &'static [DeviceDescriptor]) -> Self {
        Self { devices }
    }

    /// Registry over the compiled-in [`DEVICES`] table
    pub const fn builtin() -> Self {
        Self::new(DEVICES)
    }

    /// Find the first device with exactly this signature
    pub fn find(&self, signature: u32) -> Option<&'static DeviceDescriptor> {
        self.devices.iter().find(|d| d.signature == signature)
    }

    /// Find a device by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&'static DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = &'static DeviceDescriptor> {
        self.devices.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true if the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
