//! List commands implementation

use hvrescue_core::device::DeviceRegistry;

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    print!("{}", programmers::programmer_help());
}

/// List all supported devices
pub fn list_devices() {
    println!("Supported devices:");
    println!();
    println!(
        "{:<12} {:>10} {:>8} {:>18} {:>18}",
        "Name", "Signature", "EEPROM", "Default", "Bootloader"
    );
    println!("{}", "-".repeat(70));

    for device in DeviceRegistry::builtin().iter() {
        println!(
            "{:<12} {:>10} {:>8} {:>18} {:>18}",
            device.name,
            format!("0x{:06X}", device.signature),
            format_size(device.eeprom_size),
            device.default_fuse.to_string(),
            device.bootloader_fuse.to_string()
        );
    }
}

fn format_size(bytes: u16) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
